//! Tenant identity and the per-request tenant binding.
//!
//! Every stored entity carries the `TenantId` it was created under. Services
//! receive an explicit [`TenantContext`]; front ends that cannot thread one
//! through may bind it for a task with [`TenantContext::set_current`].

mod context;

pub use context::{Tenant, TenantContext, TenantOwned};
