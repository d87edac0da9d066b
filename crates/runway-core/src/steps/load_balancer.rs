//! External HTTPS load balancer in front of a Cloud Run service
//!
//! Resources are named `<prefix>-<suffix>` and created in dependency order:
//!
//! ```text
//! address ─────────────────────────────────┐
//! serverless NEG ─> backend service ─> URL map ─> HTTPS proxy ─> forwarding rule
//!                          managed certificate ─┘
//! ```
//!
//! Every resource is looked up by name first, so a second run only fills gaps.
//! The NEG is attached whenever the backend service does not list it yet.

use super::Outcome;
use crate::context::Context;
use crate::error::Result;
use crate::progress;
use crate::state::{LoadBalancerState, ProvisioningState};
use runway_gcloud::{ComputeCollection, ComputeResource};

/// Names of every resource of one load balancer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerNames {
    pub address: String,
    pub neg: String,
    pub backend: String,
    pub url_map: String,
    pub certificate: String,
    pub proxy: String,
    pub rule: String,
}

impl LoadBalancerNames {
    pub fn new(prefix: &str) -> Self {
        Self {
            address: format!("{}-ip", prefix),
            neg: format!("{}-neg", prefix),
            backend: format!("{}-backend", prefix),
            url_map: format!("{}-url-map", prefix),
            certificate: format!("{}-cert", prefix),
            proxy: format!("{}-https-proxy", prefix),
            rule: format!("{}-https-rule", prefix),
        }
    }
}

/// Existing resource or a freshly created one; `true` when created
async fn ensure(
    ctx: &Context,
    region: &str,
    collection: ComputeCollection,
    name: &str,
    flags: Vec<String>,
) -> Result<(ComputeResource, bool)> {
    if let Some(existing) = ctx.gcloud.find_compute(collection, name, region).await? {
        progress::detail(&format!("{} {} already exists", collection, name));
        return Ok((existing, false));
    }
    let created = ctx
        .gcloud
        .create_compute(collection, name, region, &flags)
        .await?;
    progress::detail(&format!("{} {} created", collection, name));
    Ok((created, true))
}

pub async fn create_load_balancer(ctx: &Context, state: &mut ProvisioningState) -> Result<Outcome> {
    let service = ctx
        .prompter
        .text("Cloud Run service name", Some("production"))?;
    let domain = ctx.prompter.text("Domain (e.g. api.example.com)", None)?;
    let domain = domain.trim().to_string();
    if domain.is_empty() {
        return Ok(Outcome::skipped("no domain given"));
    }
    let prefix = ctx
        .prompter
        .text("Resource name prefix", Some(service.as_str()))?;

    let names = LoadBalancerNames::new(&prefix);
    let region = state.region.clone();

    let (address, _) = ensure(
        ctx,
        &region,
        ComputeCollection::Address,
        &names.address,
        vec!["--ip-version=IPV4".to_string()],
    )
    .await?;

    ensure(
        ctx,
        &region,
        ComputeCollection::NetworkEndpointGroup,
        &names.neg,
        vec![
            "--network-endpoint-type=serverless".to_string(),
            format!("--cloud-run-service={}", service),
        ],
    )
    .await?;

    let (backend, _) = ensure(
        ctx,
        &region,
        ComputeCollection::BackendService,
        &names.backend,
        vec!["--load-balancing-scheme=EXTERNAL_MANAGED".to_string()],
    )
    .await?;
    if backend.has_backend_group(&names.neg) {
        progress::detail(&format!("{} already attached to {}", names.neg, names.backend));
    } else {
        ctx.gcloud
            .add_backend(&names.backend, &names.neg, &region)
            .await?;
    }

    ensure(
        ctx,
        &region,
        ComputeCollection::UrlMap,
        &names.url_map,
        vec![format!("--default-service={}", names.backend)],
    )
    .await?;

    ensure(
        ctx,
        &region,
        ComputeCollection::SslCertificate,
        &names.certificate,
        vec![format!("--domains={}", domain)],
    )
    .await?;

    ensure(
        ctx,
        &region,
        ComputeCollection::TargetHttpsProxy,
        &names.proxy,
        vec![
            format!("--url-map={}", names.url_map),
            format!("--ssl-certificates={}", names.certificate),
        ],
    )
    .await?;

    ensure(
        ctx,
        &region,
        ComputeCollection::ForwardingRule,
        &names.rule,
        vec![
            "--load-balancing-scheme=EXTERNAL_MANAGED".to_string(),
            format!("--target-https-proxy={}", names.proxy),
            format!("--address={}", names.address),
            "--ports=443".to_string(),
        ],
    )
    .await?;

    let ip_address = address.address.clone();
    if let Some(ip) = &ip_address {
        progress::detail(&format!("point {} at {}", domain, ip));
    }
    state.load_balancer = Some(LoadBalancerState {
        prefix,
        service,
        domain,
        ip_address,
    });

    Ok(Outcome::done(format!("load balancer {}", names.rule)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Answer, FakeRunner, ScriptedPrompter, bound_state, context};

    #[test]
    fn test_names() {
        let names = LoadBalancerNames::new("api");
        assert_eq!(names.address, "api-ip");
        assert_eq!(names.url_map, "api-url-map");
        assert_eq!(names.rule, "api-https-rule");
    }

    #[tokio::test]
    async fn test_creates_missing_resources_in_order() {
        let runner = FakeRunner::new();
        runner.on(
            "gcloud compute addresses describe api-ip",
            r#"{"name": "api-ip", "address": "34.120.0.7"}"#,
        );
        for (group, name) in [
            ("network-endpoint-groups", "api-neg"),
            ("backend-services", "api-backend"),
            ("url-maps", "api-url-map"),
            ("ssl-certificates", "api-cert"),
            ("target-https-proxies", "api-https-proxy"),
            ("forwarding-rules", "api-https-rule"),
        ] {
            runner.on(
                &format!("gcloud compute {} describe {}", group, name),
                format!(r#"{{"name": "{}"}}"#, name),
            );
        }
        let prompter = ScriptedPrompter::new([
            Answer::Text("api".into()),
            Answer::Text("api.example.com".into()),
            Answer::Default,
        ]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();

        create_load_balancer(&ctx, &mut state).await.unwrap();

        let creates: Vec<String> = runner
            .lines()
            .into_iter()
            .filter(|line| line.contains(" create "))
            .collect();
        assert_eq!(creates.len(), 7);
        assert!(creates[0].starts_with("gcloud compute addresses create api-ip --global"));
        assert!(creates[1].starts_with(
            "gcloud compute network-endpoint-groups create api-neg --region=europe-west1"
        ));
        assert!(creates[4].contains("--domains=api.example.com"));
        assert!(creates[6].contains("--address=api-ip"));
        assert_eq!(
            runner.count("gcloud compute backend-services add-backend api-backend"),
            1
        );

        let lb = state.load_balancer.unwrap();
        assert_eq!(lb.ip_address.as_deref(), Some("34.120.0.7"));
        assert_eq!(lb.domain, "api.example.com");
    }

    #[tokio::test]
    async fn test_existing_resources_are_reused() {
        let runner = FakeRunner::new();
        runner.on(
            "gcloud compute addresses list",
            r#"[{"name": "api-ip", "address": "34.120.0.7"}]"#,
        );
        runner.on(
            "gcloud compute backend-services list",
            r#"[{"name": "api-backend", "backends": [{"group": "https://www.googleapis.com/compute/v1/projects/p/regions/europe-west1/networkEndpointGroups/api-neg"}]}]"#,
        );
        for group in [
            "network-endpoint-groups",
            "url-maps",
            "ssl-certificates",
            "target-https-proxies",
            "forwarding-rules",
        ] {
            runner.on(&format!("gcloud compute {} describe", group), r#"{"name": "x"}"#);
        }
        let prompter = ScriptedPrompter::new([
            Answer::Text("api".into()),
            Answer::Text("api.example.com".into()),
            Answer::Default,
        ]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();

        create_load_balancer(&ctx, &mut state).await.unwrap();

        assert_eq!(runner.count("gcloud compute addresses create"), 0);
        assert_eq!(runner.count("gcloud compute backend-services create"), 0);
        assert_eq!(runner.count("gcloud compute backend-services add-backend"), 0);
        assert_eq!(runner.count("gcloud compute url-maps create"), 1);
    }

    #[tokio::test]
    async fn test_existing_backend_without_neg_gets_attached() {
        let runner = FakeRunner::new();
        runner.on(
            "gcloud compute backend-services list",
            r#"[{"name": "api-backend", "backends": []}]"#,
        );
        for group in [
            "addresses",
            "network-endpoint-groups",
            "url-maps",
            "ssl-certificates",
            "target-https-proxies",
            "forwarding-rules",
        ] {
            runner.on(&format!("gcloud compute {} describe", group), r#"{"name": "x"}"#);
        }
        let prompter = ScriptedPrompter::new([
            Answer::Text("api".into()),
            Answer::Text("api.example.com".into()),
            Answer::Default,
        ]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();

        create_load_balancer(&ctx, &mut state).await.unwrap();

        assert_eq!(runner.count("gcloud compute backend-services create"), 0);
        assert_eq!(
            runner.count(
                "gcloud compute backend-services add-backend api-backend --global \
                 --network-endpoint-group=api-neg"
            ),
            1
        );
        assert_eq!(runner.count("gcloud compute forwarding-rules create"), 1);
    }

    #[tokio::test]
    async fn test_empty_domain_skips() {
        let runner = FakeRunner::new();
        let prompter = ScriptedPrompter::new([Answer::Default, Answer::Text(" ".into())]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&runner, &prompter, dir.path());
        let mut state = bound_state();

        let outcome = create_load_balancer(&ctx, &mut state).await.unwrap();
        assert!(matches!(outcome, Outcome::Skipped(_)));
        assert_eq!(runner.call_count(), 0);
    }
}
