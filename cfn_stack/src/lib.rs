//! CloudFormation template model and deployer.
//!
//! Resources implement [`CfnResource`] and are rendered into a [`Template`]
//! against a [`ResolveContext`] that supplies looked-up values. The
//! [`Deployer`] applies a rendered template as a stack.

mod error;
pub use error::*;
mod value;
pub use value::*;
mod template;
pub use template::*;
mod deploy;
pub use deploy::*;
