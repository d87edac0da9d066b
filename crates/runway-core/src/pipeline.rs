//! Step pipeline
//!
//! ```text
//! Preflight -> Authenticate -> SelectConfig -> SelectProject -> EnableApis
//!          \-> UseActiveConfig (--skip-auth) -------------------/
//!
//! then one Action:
//!   DeployService  SqlInstance -> Database -> Environment -> Secrets -> DeployCommand
//!   BuildTrigger   Connection -> Repository -> Trigger
//!   AdHocSecrets   key/value loop
//!   LoadBalancer   address .. forwarding rule
//! ```
//!
//! Steps run strictly in order. The first failure ends the run; nothing is
//! rolled back and a later run reuses whatever was already created.

use crate::context::Context;
use crate::environment::{self, KeywordClassifier, SecretPredicate};
use crate::error::{ProvisionError, Result};
use crate::progress::StepLogger;
use crate::report::Report;
use crate::state::ProvisioningState;
use crate::steps::{
    Outcome, apis, auth, build_trigger, database, deploy, load_balancer, preflight, project,
    secrets,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Preflight,
    Authenticate,
    UseActiveConfig,
    SelectConfig,
    SelectProject,
    EnableApis,
    SelectSqlInstance,
    SelectDatabase,
    CollectEnvironment,
    CreateSecrets,
    AssembleDeployCommand,
    CreateBuildTrigger,
    CreateAdHocSecrets,
    CreateLoadBalancer,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Preflight => "Preflight checks",
            Self::Authenticate => "Authentication",
            Self::UseActiveConfig => "Active configuration",
            Self::SelectConfig => "CLI configuration",
            Self::SelectProject => "Project",
            Self::EnableApis => "Enable APIs",
            Self::SelectSqlInstance => "SQL instance",
            Self::SelectDatabase => "Database",
            Self::CollectEnvironment => "Environment variables",
            Self::CreateSecrets => "Secrets",
            Self::AssembleDeployCommand => "Cloud Run deploy command",
            Self::CreateBuildTrigger => "Build trigger",
            Self::CreateAdHocSecrets => "New secrets",
            Self::CreateLoadBalancer => "Load balancer",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Preflight => "preflight",
            Self::Authenticate => "auth",
            Self::UseActiveConfig => "active-config",
            Self::SelectConfig => "config",
            Self::SelectProject => "project",
            Self::EnableApis => "apis",
            Self::SelectSqlInstance => "sql-instance",
            Self::SelectDatabase => "database",
            Self::CollectEnvironment => "environment",
            Self::CreateSecrets => "secrets",
            Self::AssembleDeployCommand => "deploy",
            Self::CreateBuildTrigger => "build-trigger",
            Self::CreateAdHocSecrets => "adhoc-secrets",
            Self::CreateLoadBalancer => "load-balancer",
        }
    }

    /// Steps that establish the project context
    pub fn setup_steps(skip_auth: bool) -> Vec<Self> {
        let mut steps = vec![Self::Preflight];
        if skip_auth {
            steps.push(Self::UseActiveConfig);
        } else {
            steps.extend([Self::Authenticate, Self::SelectConfig, Self::SelectProject]);
        }
        steps.push(Self::EnableApis);
        steps
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// What to do once the project is set up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    DeployService,
    BuildTrigger,
    AdHocSecrets,
    LoadBalancer,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Self::DeployService,
        Self::BuildTrigger,
        Self::AdHocSecrets,
        Self::LoadBalancer,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::DeployService => "Create a cloud run service",
            Self::BuildTrigger => "Create a build trigger",
            Self::AdHocSecrets => "Create a secret",
            Self::LoadBalancer => "Create a load balancer",
        }
    }

    pub fn steps(&self) -> &'static [Step] {
        match self {
            Self::DeployService => &[
                Step::SelectSqlInstance,
                Step::SelectDatabase,
                Step::CollectEnvironment,
                Step::CreateSecrets,
                Step::AssembleDeployCommand,
            ],
            Self::BuildTrigger => &[Step::CreateBuildTrigger],
            Self::AdHocSecrets => &[Step::CreateAdHocSecrets],
            Self::LoadBalancer => &[Step::CreateLoadBalancer],
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Reuse the active gcloud configuration instead of logging in
    pub skip_auth: bool,
}

pub struct RunOutcome {
    pub action: Action,
    pub state: ProvisioningState,
    pub report: Report,
}

pub struct Pipeline {
    ctx: Context,
    options: RunOptions,
    predicate: Box<dyn SecretPredicate>,
}

impl Pipeline {
    pub fn new(ctx: Context, options: RunOptions) -> Self {
        Self {
            ctx,
            options,
            predicate: Box::new(KeywordClassifier::default()),
        }
    }

    /// Replace the keyword heuristic used to suggest secrets
    pub fn with_predicate(mut self, predicate: impl SecretPredicate + 'static) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let mut state = ProvisioningState::new(&self.ctx.settings);
        let mut logger = StepLogger::new();

        for step in Step::setup_steps(self.options.skip_auth) {
            self.run_step(&mut logger, step, &mut state).await?;
        }

        let action = self.choose_action(&state)?;
        tracing::info!("Running {:?} on {}", action, state.project.id);
        for step in action.steps() {
            self.run_step(&mut logger, *step, &mut state).await?;
        }

        logger.print_summary();
        let report = Report::from_state(&state);
        Ok(RunOutcome {
            action,
            state,
            report,
        })
    }

    fn choose_action(&self, state: &ProvisioningState) -> Result<Action> {
        let labels: Vec<String> = Action::ALL.iter().map(|a| a.label().to_string()).collect();
        let message = format!("With project {}, what do you want to do?", state.project.id);
        let choice = self.ctx.prompter.select(&message, &labels)?;
        Action::ALL
            .get(choice)
            .copied()
            .ok_or_else(|| ProvisionError::Prompt(format!("selection {} is out of range", choice)))
    }

    async fn run_step(
        &self,
        logger: &mut StepLogger,
        step: Step,
        state: &mut ProvisioningState,
    ) -> Result<()> {
        logger.start_step(step);
        match self.execute(step, state).await {
            Ok(Outcome::Done(message)) => {
                logger.step_success(message.as_deref());
                Ok(())
            }
            Ok(Outcome::Skipped(reason)) => {
                logger.step_skipped(&reason);
                Ok(())
            }
            Err(e) => {
                logger.step_failed(&e.to_string());
                logger.print_summary();
                Err(e)
            }
        }
    }

    async fn execute(&self, step: Step, state: &mut ProvisioningState) -> Result<Outcome> {
        let ctx = &self.ctx;
        match step {
            Step::Preflight => preflight::run(ctx).await,
            Step::Authenticate => auth::authenticate(ctx, state).await,
            Step::UseActiveConfig => auth::use_active_configuration(ctx, state).await,
            Step::SelectConfig => project::select_configuration(ctx, state).await,
            Step::SelectProject => project::select_project(ctx, state).await,
            Step::EnableApis => apis::enable_apis(ctx, state).await,
            Step::SelectSqlInstance => database::select_sql_instance(ctx, state).await,
            Step::SelectDatabase => database::select_database(ctx, state).await,
            Step::CollectEnvironment => {
                let count = environment::collect(ctx, self.predicate.as_ref(), state).await?;
                Ok(Outcome::done(format!("{} variables collected", count)))
            }
            Step::CreateSecrets => secrets::create_secrets(ctx, state).await,
            Step::AssembleDeployCommand => deploy::assemble_deploy_command(ctx, state).await,
            Step::CreateBuildTrigger => build_trigger::create_build_trigger(ctx, state).await,
            Step::CreateAdHocSecrets => secrets::create_ad_hoc_secrets(ctx, state).await,
            Step::CreateLoadBalancer => load_balancer::create_load_balancer(ctx, state).await,
        }
    }
}
