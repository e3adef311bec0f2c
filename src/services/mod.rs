pub mod activation_service;
pub mod cluster_service;
pub mod customer_service;
pub(crate) mod lookup;
pub mod matrix_service;
pub mod release_service;
pub mod step_service;
pub mod template_service;

pub use activation_service::{ActivationOutcome, ActivationService};
pub use cluster_service::{ClusterInput, ClusterService, ClusterUpdate, ClusterWithCustomers};
pub use customer_service::{
    ClusterCustomers, CustomerInput, CustomerService, CustomerUpdate, CustomerWithCluster,
};
pub use matrix_service::{
    ClusterMatrix, ClusterSteps, CustomerStepGroup, MatrixColumn, MatrixRow, MatrixService,
    StepKey,
};
pub use release_service::{
    ReleaseInput, ReleaseService, ReleaseStats, ReleaseUpdate, ReleaseWithTemplates,
};
pub use step_service::{
    BulkOutcome, CustomStepInput, CustomStepOutcome, CustomStepUpdate, StepDetails, StepService,
    StepStats,
};
pub use template_service::{NewTemplate, TemplateDeletion, TemplateService, TemplateUpdate};
