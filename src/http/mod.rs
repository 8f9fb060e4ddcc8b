//! HTTP protocol layer module
//!
//! Response builders, cache validators and content types, independent of
//! how a request was dispatched.

pub mod cache;
pub mod mime;
pub mod response;

pub use response::{
    build_304_response, build_404_response, build_405_response, build_413_response,
    build_500_response, build_ajax_response, build_asset_response, build_options_response,
    build_page_response,
};
