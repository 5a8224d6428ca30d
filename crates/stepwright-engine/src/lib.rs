pub mod config;
pub mod driver;
pub mod executor;
pub mod hints;
pub mod parser;
pub mod resolver;
pub mod scenario;
pub mod step;

pub use config::{Config, ConfigError, ConfigLoader};
pub use driver::{Driver, DriverError, ElementAction, ElementHandle, ReadyState, Selector};
pub use executor::{ExecutorConfig, ScenarioExecutor, ScenarioResult, StepError, StepResult};
pub use hints::{FileHintProvider, HintError, StructureHintProvider, StructureHints};
pub use parser::StepParser;
pub use resolver::{ElementResolver, ResolveError, Resolved, StrategyTier};
pub use scenario::{load_scenarios, Scenario, ScenarioError};
pub use step::{ActionKind, ParseWarning, Step, StepAssertion, WaitCondition};
