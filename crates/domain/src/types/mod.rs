//! Domain types and models

pub mod credential;
pub mod identity;
pub mod volume;

pub use credential::{Credential, EndpointCatalog};
pub use identity::{
    AuthOptions, AuthRequest, AuthScoped, CatalogEndpoint, CatalogService, DomainRef, Identity,
    PasswordMethod, ProjectRef, Scope, TokenBody, TokenProject, TokenResponse, UserCredentials,
};
pub use volume::{Volume, VolumeDetails, VolumeImageMetadata};
