//! Configuration section definitions.
//!
//! Each module corresponds to a section in `edgeship.toml`:
//!
//! | Module         | TOML Section     | Purpose                                  |
//! |----------------|------------------|------------------------------------------|
//! | `site`         | `[site]`         | Framework, app root, edge/dev modes      |
//! | `server`       | `[server]`       | Server function settings                 |
//! | `assets`       | `[assets]`       | Upload headers, static transform         |
//! | `invalidation` | `[invalidation]` | CDN invalidation paths and wait          |
//! | `domain`       | `[domain]`       | Custom domain alias                      |
//! | `transform`    | `[transform]`    | Opaque provisioning overrides            |

mod assets;
mod domain;
mod invalidation;
mod server;
pub mod site;
mod transform;

pub use assets::AssetsConfig;
pub use domain::DomainConfig;
pub use invalidation::InvalidationConfig;
pub use server::ServerConfig;
pub use site::SiteSectionConfig;
pub use transform::TransformConfig;
