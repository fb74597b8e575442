//! Source composition for [`AppConfig`](super::AppConfig).

pub(crate) mod merge_policy;
pub(crate) mod service;
