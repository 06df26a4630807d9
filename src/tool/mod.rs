// ABOUTME: Tool module - defines tools, schemas, the registry, and execution.
// ABOUTME: Core abstraction for the capabilities an agent can invoke.

mod executor;
mod observation;
mod registry;
mod schema;
mod traits;

pub use executor::*;
pub use observation::*;
pub use registry::*;
pub use schema::*;
pub use traits::*;

#[cfg(test)]
mod executor_test;
#[cfg(test)]
mod observation_test;
#[cfg(test)]
mod schema_test;
