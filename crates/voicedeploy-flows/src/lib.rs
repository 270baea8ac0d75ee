//! # voicedeploy-flows
//!
//! Contact-flow templates: which ones a tenant needs, where they live, and how
//! their placeholder tokens are filled in.
//!
//! ## Key Types
//!
//! - [`FeatureSet`] / [`InboundTemplate`] - Pick the inbound template for a feature pair
//! - [`TemplateCatalog`] - The on-disk template tree (flows, hours, languages, messages)
//! - [`LanguageCatalog`] - Languages and Polly voices, with region lookup
//! - [`TokenMap`] - Ordered token replacement over text or JSON
//! - [`TemplateResolver`] - Copy templates into the working directory and resolve them
//!
//! ## Resolution order
//!
//! Leaf flows (screen pop, survey) are resolved first and each yields a
//! [`FlowReference`]. The inbound flow is resolved last and points at the leaf
//! flows through those references.

mod catalog;
mod error;
mod language;
mod resolver;
mod selection;
mod tokens;

pub use catalog::TemplateCatalog;
pub use error::FlowError;
pub use language::{
    hours_region, region_for_language, Language, LanguageCatalog, LanguageCategory,
    DEFAULT_LANGUAGE, DEFAULT_REGION,
};
pub use resolver::{
    logical_ids, queue_name, FlowContext, FlowKind, FlowReference, MaterializedFlows,
    ResolvedFlow, ResolvedFlows, TemplateResolver, QUEUE_ARN_REFERENCE,
};
pub use selection::{FeatureSet, InboundTemplate, SCREENPOP_FLOW_TEMPLATE, SURVEY_FLOW_TEMPLATE};
pub use tokens::{substitute_json, substitute_text, token, TokenMap};
