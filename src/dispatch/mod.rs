//! Request dispatcher
//!
//! Turns one decoded request into either a rendered page or an AJAX response:
//! resolve the action, run its mod, then render header, nav, page body and
//! footer from the active theme with per-fragment fallback to `default`.

pub mod context;
pub mod registry;

use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::AppState;
use crate::error::FrameworkError;
use crate::logger::DebugLog;
use crate::theme::template::{COMMON_DIR, PAGES_DIR};
use crate::theme::ResolvedPath;

pub use context::{FileSessionStore, FrameworkContext, RequestInfo, SessionStore, UserSession};
pub use registry::{AjaxHandler, AjaxResponse, ModHandler, ModRegistry};

/// Query parameter carrying the requested action
pub const ROUTE_PARAM: &str = "_route_";
/// Action delegated to the AJAX handler
pub const AJAX_ACTION: &str = "ajax";

/// Which mod and templates served a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchTrace {
    /// `(origin, action)` of the mod that ran
    pub mods: Vec<(&'static str, String)>,
    pub templates: Vec<ResolvedPath>,
}

#[derive(Debug)]
pub enum DispatchOutcome {
    Page { html: String, trace: DispatchTrace },
    Ajax(AjaxResponse),
}

/// Requested action from the query, else `default_action`
pub fn resolve_action(request: &RequestInfo, default_action: &str) -> String {
    request
        .query
        .get(ROUTE_PARAM)
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .unwrap_or(default_action)
        .to_string()
}

/// Actions that may be turned into a template file name
pub fn is_safe_action(action: &str) -> bool {
    !action.is_empty()
        && action
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Handle one request end to end
pub async fn dispatch(
    state: &AppState,
    request: RequestInfo,
    session: UserSession,
) -> Result<DispatchOutcome, FrameworkError> {
    let action = resolve_action(&request, &state.config.app.default_action);
    let mut ctx = FrameworkContext {
        action: action.clone(),
        db: Arc::clone(&state.db),
        debug: DebugLog::new(state.env.is_dev),
        session,
        mod_data: Value::Null,
        web_root: state.config.app.web_root.clone(),
        root_path: state.config.app.root_path.clone(),
        request,
        messaging: Arc::clone(&state.messaging),
    };

    ctx.debug.group("Initial State");
    ctx.debug.log(&ctx.request, "request");
    ctx.debug.log(&ctx.session, "session");
    ctx.debug.log(&ctx.root_path, "root_path");
    ctx.debug.group_end();

    ctx.debug.group("Process State");
    let mut trace = DispatchTrace::default();
    let outcome = if action == AJAX_ACTION {
        // the page is never assembled for AJAX requests
        process_ajax(state, &ctx).await.map(DispatchOutcome::Ajax)
    } else {
        process_page(state, &mut ctx, &mut trace).await
    };
    ctx.debug.group_end();

    if ctx.debug.is_enabled() {
        ctx.debug.group("Completion State");
        ctx.debug.log(&trace_summary(&trace), "debugging");
        ctx.debug.log(&*ctx.db, "database");
        if let Err(e) = &outcome {
            ctx.debug.log(&e.to_string(), "error");
        }
        ctx.debug.group_end();
        ctx.debug.flush();
    }

    outcome
}

async fn process_ajax(
    state: &AppState,
    ctx: &FrameworkContext,
) -> Result<AjaxResponse, FrameworkError> {
    let handler = state
        .registry
        .ajax_handler()
        .ok_or(FrameworkError::MissingHandler)?;
    handler.process_action(ctx).await
}

async fn process_page(
    state: &AppState,
    ctx: &mut FrameworkContext,
    trace: &mut DispatchTrace,
) -> Result<DispatchOutcome, FrameworkError> {
    run_mod(state, ctx, trace).await?;
    let mut html = String::new();
    render_page(state, ctx, &mut html, trace).await?;
    Ok(DispatchOutcome::Page {
        html,
        trace: trace.clone(),
    })
}

/// Run the mod registered for the action; no registration is a no-op
async fn run_mod(
    state: &AppState,
    ctx: &mut FrameworkContext,
    trace: &mut DispatchTrace,
) -> Result<(), FrameworkError> {
    let resolved = state.registry.resolve(&state.env.theme, &ctx.action);
    ctx.debug.log(
        &json!({
            "action": ctx.action,
            "resolved": resolved.as_ref().map(|(origin, _)| *origin),
        }),
        "mod",
    );

    let Some((origin, factory)) = resolved else {
        return Ok(());
    };
    trace.mods.push((origin, ctx.action.clone()));

    let handler = factory();
    ctx.mod_data = handler.process(ctx).await?;
    Ok(())
}

/// Render the four slots in order; absent fragments render nothing
async fn render_page(
    state: &AppState,
    ctx: &FrameworkContext,
    output: &mut String,
    trace: &mut DispatchTrace,
) -> Result<(), FrameworkError> {
    let data = template_data(state, ctx);
    let body_slot = is_safe_action(&ctx.action).then_some((PAGES_DIR, ctx.action.as_str()));

    let slots = [
        Some((COMMON_DIR, "header")),
        Some((COMMON_DIR, "nav")),
        body_slot,
        Some((COMMON_DIR, "footer")),
    ];

    for (sub_dir, name) in slots.into_iter().flatten() {
        let Some(resolved) = state.renderer.resolve(&state.roots, sub_dir, name) else {
            continue;
        };
        output.push_str(&state.renderer.render(&resolved, &data).await?);
        trace.templates.push(resolved);
    }
    Ok(())
}

fn template_data(state: &AppState, ctx: &FrameworkContext) -> Value {
    json!({
        "action": ctx.action,
        "theme": state.env.theme,
        "web_root": ctx.web_root,
        "mod_data": ctx.mod_data,
        "session": {
            "user_id": ctx.session.user_id,
            "authenticated": ctx.session.is_authenticated(),
        },
        "query": ctx.request.query,
        "is_dev": state.env.is_dev,
    })
}

fn trace_summary(trace: &DispatchTrace) -> Value {
    json!({
        "mods": trace.mods,
        "templates": trace
            .templates
            .iter()
            .map(|t| (t.origin, t.path.display().to_string()))
            .collect::<Vec<_>>(),
    })
}
