//! AWS binding for [`FleetProvider`].
//!
//! Maps the trait onto the autoscaling, ELBv2 and EC2 SDK clients.
//! Credentials and region come from the ambient environment
//! (`aws_config::load_from_env`); acquiring them is out of scope here.

use async_trait::async_trait;

use fleetroll_core::{GroupSnapshot, InstanceSummary, LifecycleState, TargetHealth};

use crate::api::FleetProvider;
use crate::error::{ProviderError, ProviderResult};

/// AWS-backed fleet provider.
pub struct AwsFleet {
    asg: aws_sdk_autoscaling::Client,
    elb: aws_sdk_elasticloadbalancingv2::Client,
    ec2: aws_sdk_ec2::Client,
}

impl AwsFleet {
    /// Build clients from the ambient AWS environment.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self {
            asg: aws_sdk_autoscaling::Client::new(&config),
            elb: aws_sdk_elasticloadbalancingv2::Client::new(&config),
            ec2: aws_sdk_ec2::Client::new(&config),
        }
    }
}

fn api_err(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Api(e.to_string())
}

#[async_trait]
impl FleetProvider for AwsFleet {
    async fn describe_group(&self, name: &str) -> ProviderResult<GroupSnapshot> {
        let out = self
            .asg
            .describe_auto_scaling_groups()
            .auto_scaling_group_names(name)
            .send()
            .await
            .map_err(api_err)?;

        let group = out
            .auto_scaling_groups()
            .first()
            .ok_or_else(|| ProviderError::GroupNotFound(name.to_string()))?;

        let instances = group
            .instances()
            .iter()
            .map(|i| InstanceSummary {
                id: i.instance_id().unwrap_or_default().to_string(),
                lifecycle: LifecycleState::parse(
                    i.lifecycle_state().map(|s| s.as_str()).unwrap_or(""),
                ),
            })
            .collect();

        Ok(GroupSnapshot {
            name: group
                .auto_scaling_group_name()
                .unwrap_or(name)
                .to_string(),
            desired: group.desired_capacity().unwrap_or(0).max(0) as u32,
            max: group.max_size().unwrap_or(0).max(0) as u32,
            instances,
            target_groups: group.target_group_arns().to_vec(),
        })
    }

    async fn update_capacity(&self, name: &str, desired: u32, max: u32) -> ProviderResult<()> {
        self.asg
            .update_auto_scaling_group()
            .auto_scaling_group_name(name)
            .desired_capacity(desired as i32)
            .max_size(max as i32)
            .send()
            .await
            .map_err(api_err)?;
        Ok(())
    }

    async fn target_health(
        &self,
        target_group: &str,
        instance: &str,
    ) -> ProviderResult<TargetHealth> {
        let target = aws_sdk_elasticloadbalancingv2::types::TargetDescription::builder()
            .id(instance)
            .build();
        let out = self
            .elb
            .describe_target_health()
            .target_group_arn(target_group)
            .targets(target)
            .send()
            .await
            .map_err(api_err)?;

        let state = out
            .target_health_descriptions()
            .first()
            .and_then(|d| d.target_health())
            .and_then(|h| h.state())
            .map(|s| s.as_str().to_string());

        match state {
            Some(s) => Ok(TargetHealth::parse(&s)),
            None => Err(ProviderError::InstanceNotFound(instance.to_string())),
        }
    }

    async fn detach_instance(
        &self,
        group: &str,
        instance: &str,
        decrement_desired: bool,
    ) -> ProviderResult<()> {
        self.asg
            .detach_instances()
            .auto_scaling_group_name(group)
            .instance_ids(instance)
            .should_decrement_desired_capacity(decrement_desired)
            .send()
            .await
            .map_err(api_err)?;
        Ok(())
    }

    async fn terminate_instance(&self, instance: &str) -> ProviderResult<()> {
        self.ec2
            .terminate_instances()
            .instance_ids(instance)
            .send()
            .await
            .map_err(api_err)?;
        Ok(())
    }
}
