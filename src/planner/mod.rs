//! Planning module for identity provider associations.
//!
//! This module compares the observed and desired identity provider of a
//! cluster, emits the ordered procedures that converge them, and runs those
//! procedures in order.

mod plan;
mod procedure;
mod executor;

pub use plan::{IdentityProviderPlan, PlanContext, WaitSettings};
pub use procedure::{Procedure, ProcedureKind};
pub use executor::{ExecutionResult, PlanExecutor, ProcedureResult};
