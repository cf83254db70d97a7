//! Mock Synth
//!
//! Synthesizes mock HTTP responses from TypeScript-style interface
//! declarations and resolves them per request.
//!
//! # Features
//!
//! - **Annotations**: `@mock` doc tags as JSON literals, `() => expr`,
//!   `(body) => expr` or `faker.*` calls
//! - **Realistic Defaults**: Unannotated fields get values chosen by field name
//! - **Dynamic Bodies**: Regenerate a body per request from the request body
//! - **Guards**: Choose between two responses from a predicate on the request
//! - **Interpolation**: Substitute `:param`, `{{body.*}}` and `{{query.*}}`
//!
//! # Example Configuration
//!
//! ```yaml
//! settings:
//!   interfaces_dir: ./types
//! endpoints:
//!   - id: get-user
//!     method: GET
//!     path: /users/:id
//!     interface: User
//!     dynamic: true
//!     guard:
//!       condition:
//!         field: role
//!         operator: equals
//!         value: admin
//!       left:
//!         status: 200
//!         body: { id: ":id", admin: true }
//!       right:
//!         status: 403
//!         interface: ErrorResponse
//! ```

pub mod annotation;
pub mod cache;
pub mod config;
pub mod context;
pub mod deferred;
pub mod descriptor;
pub mod engine;
pub mod expr;
pub mod faker;
pub mod guard;
pub mod heuristics;
pub mod interpolate;
pub mod matcher;
pub mod source;
pub mod synth;

pub use config::MockConfig;
pub use context::RequestContext;
pub use engine::{EngineConfig, Endpoint, ResolvedResponse, ResponseEngine};
