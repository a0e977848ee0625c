//! Command handlers grouped by resource.

pub(crate) mod consume;
pub(crate) mod egress_webhooks;
pub(crate) mod filters;
pub(crate) mod ingress_webhooks;
pub(crate) mod logs;
pub(crate) mod offsets;
pub(crate) mod paths;
pub(crate) mod publish;
pub(crate) mod receive;
pub(crate) mod tokens;
