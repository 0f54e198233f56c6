pub mod navigation;

pub use navigation::{NavigationPlanner, Plan, PlannerConfig};
