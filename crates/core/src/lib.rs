//! Domain core for the Breezy CRM bridge.
//!
//! Holds configuration, the CRM gateway seam, and the deal router that turns a
//! product selection into CRM writes.

pub mod catalog;
pub mod config;
pub mod crm;
pub mod domain;
pub mod errors;
pub mod router;
pub mod saga;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use catalog::CrmCatalog;
pub use crm::{AssociationTarget, ContactSearch, CrmGateway};
pub use domain::contact::{Contact, ContactRow};
pub use domain::opportunity::{OpportunityReport, Verdict};
pub use domain::product::ProductKind;
pub use errors::{CrmError, InterfaceError, Operation};
pub use router::{DealOutcome, DealRequest, DealRouter, DealRoutingError};
pub use saga::{BundleFailure, BundleStep, CommittedStep};
