pub mod assign;
pub mod config;
pub mod defaults;
pub mod generator;
pub mod models;
pub mod service;
pub mod ui;

pub use config::{Config, ConfigError, Defaults, IdType, OpenApiVersion, PathPattern, ServiceFilter};
pub use generator::{GeneratorError, SpecGenerator};
pub use models::{Components, ExternalDocs, Info, RootDocument, Tag};
pub use service::{
    CompositeKind, CompositeRef, CustomMethod, CustomMethodRegistrar, DeclaredRegistrar,
    DocOptions, IdField, MultiCapability, NoopRegistrar, OperationOverride, SchemaRef,
    ServiceDescriptor, ServiceOptions,
};
pub use ui::{NoUi, SwaggerUiPage, UiContext, UiProvider};
