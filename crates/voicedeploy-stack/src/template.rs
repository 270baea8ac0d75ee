use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use voicedeploy_flows::{logical_ids, queue_name, ResolvedFlow, ResolvedFlows};
use voicedeploy_store::{
    AgentRoster, ConfigStore, HoursOfOperation, InstanceReference, SecurityProfileReference,
    ROSTER_FILE,
};

use crate::StackError;

/// Synthesized template in the working directory
pub const TEMPLATE_FILE: &str = "connect_stack.template.json";

/// Largest template `aws cloudformation deploy --template-file` accepts
/// without an S3 bucket.
pub const INLINE_TEMPLATE_LIMIT: usize = 51_200;

/// Everything the stack is built from
#[derive(Debug, Clone)]
pub struct StackInputs {
    pub tenant_name: String,
    pub instance: InstanceReference,
    pub security_profile: SecurityProfileReference,
    pub hours: HoursOfOperation,
    pub flows: ResolvedFlows,
    pub agents: AgentRoster,
}

impl StackInputs {
    /// Gather the on-disk documents. A missing roster means no agents.
    pub fn load(
        store: &ConfigStore,
        tenant_name: &str,
        flows: ResolvedFlows,
    ) -> Result<Self, StackError> {
        let roster_path = store.path(ROSTER_FILE);
        let agents = if roster_path.exists() {
            AgentRoster::read(&roster_path)?
        } else {
            debug!("No agent roster, stack will have no users");
            AgentRoster::default()
        };

        Ok(Self {
            tenant_name: tenant_name.to_string(),
            instance: store.load()?,
            security_profile: store.load()?,
            hours: store.load()?,
            flows,
            agents,
        })
    }
}

/// A CloudFormation template for one tenant
#[derive(Debug, Clone, PartialEq)]
pub struct StackTemplate {
    body: Value,
}

impl StackTemplate {
    pub fn synthesize(inputs: &StackInputs) -> Self {
        let tenant = inputs.tenant_name.as_str();
        let instance_arn = inputs.instance.arn.as_str();
        let mut resources = Map::new();

        resources.insert(
            logical_ids::HOURS_OF_OPERATION.to_string(),
            hours_resource(tenant, instance_arn, &inputs.hours),
        );

        resources.insert(
            logical_ids::QUEUE.to_string(),
            json!({
                "Type": "AWS::Connect::Queue",
                "Properties": {
                    "HoursOfOperationArn": get_att(logical_ids::HOURS_OF_OPERATION, "HoursOfOperationArn"),
                    "InstanceArn": instance_arn,
                    "Description": "Queue created using cfn",
                    "Name": queue_name(tenant),
                }
            }),
        );

        for leaf in [&inputs.flows.screenpop, &inputs.flows.survey].into_iter().flatten() {
            resources.insert(
                leaf.kind.logical_id().to_string(),
                flow_resource(leaf, instance_arn, Value::String(leaf.content.clone())),
            );
        }

        // Queue and leaf-flow ARNs inside the inbound content resolve at deploy time
        let inbound = &inputs.flows.inbound;
        resources.insert(
            inbound.kind.logical_id().to_string(),
            flow_resource(inbound, instance_arn, json!({ "Fn::Sub": inbound.content })),
        );

        resources.insert(
            logical_ids::ROUTING_PROFILE.to_string(),
            json!({
                "Type": "AWS::Connect::RoutingProfile",
                "Properties": {
                    "DefaultOutboundQueueArn": get_att(logical_ids::QUEUE, "QueueArn"),
                    "Description": "Routing profile created using cfn",
                    "InstanceArn": instance_arn,
                    "MediaConcurrencies": [
                        { "Channel": "VOICE", "Concurrency": 1 },
                        { "Channel": "CHAT", "Concurrency": 1 }
                    ],
                    "QueueConfigs": [{
                        "Delay": 0,
                        "Priority": 1,
                        "QueueReference": {
                            "Channel": "VOICE",
                            "QueueArn": get_att(logical_ids::QUEUE, "QueueArn")
                        }
                    }],
                    "Name": format!("{} Routing Profile", tenant),
                }
            }),
        );

        for (index, agent) in inputs.agents.records().iter().enumerate() {
            resources.insert(
                format!("{}{}", logical_ids::AGENT_PREFIX, index + 1),
                json!({
                    "Type": "AWS::Connect::User",
                    "Properties": {
                        "InstanceArn": instance_arn,
                        "PhoneConfig": { "PhoneType": "SOFT_PHONE", "AutoAccept": false },
                        "RoutingProfileArn": get_att(logical_ids::ROUTING_PROFILE, "RoutingProfileArn"),
                        "SecurityProfileArns": [inputs.security_profile.arn],
                        "Username": agent.username,
                        "IdentityInfo": {
                            "FirstName": agent.first_name,
                            "LastName": agent.last_name
                        },
                        "Password": agent.password,
                    }
                }),
            );
        }

        let body = json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Description": format!("Amazon Connect voice channel for {}", tenant),
            "Resources": Value::Object(resources),
        });
        Self { body }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.body["Resources"].get(logical_id)
    }

    pub fn resource_count(&self) -> usize {
        self.body["Resources"].as_object().map_or(0, |r| r.len())
    }

    /// Compact JSON, as written to disk.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.body)
    }

    pub fn fits_inline(&self) -> bool {
        self.encode()
            .map(|content| content.len() <= INLINE_TEMPLATE_LIMIT)
            .unwrap_or(false)
    }

    /// Write the template into `dir` as [`TEMPLATE_FILE`].
    pub fn write(&self, dir: &Path) -> Result<PathBuf, StackError> {
        let path = dir.join(TEMPLATE_FILE);
        let content = self.encode().map_err(|e| StackError::TemplateWrite {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;
        if content.len() > INLINE_TEMPLATE_LIMIT {
            warn!(
                bytes = content.len(),
                limit = INLINE_TEMPLATE_LIMIT,
                "Stack template is larger than CloudFormation accepts from a local file"
            );
        }
        std::fs::write(&path, &content).map_err(|source| StackError::TemplateWrite {
            path: path.clone(),
            source,
        })?;
        info!(
            path = %path.display(),
            resources = self.resource_count(),
            bytes = content.len(),
            "Wrote stack template"
        );
        Ok(path)
    }
}

fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

fn hours_resource(tenant: &str, instance_arn: &str, hours: &HoursOfOperation) -> Value {
    let config: Vec<Value> = hours
        .timeslices
        .iter()
        .map(|slice| {
            json!({
                "Day": slice.day,
                "StartTime": { "Hours": slice.start_h, "Minutes": slice.start_m },
                "EndTime": { "Hours": slice.end_h, "Minutes": slice.end_m }
            })
        })
        .collect();

    json!({
        "Type": "AWS::Connect::HoursOfOperation",
        "Properties": {
            "Config": config,
            "InstanceArn": instance_arn,
            "Name": format!("{} {}", tenant, hours.name),
            "TimeZone": hours.time_zone,
            "Description": hours.description,
        }
    })
}

fn flow_resource(flow: &ResolvedFlow, instance_arn: &str, content: Value) -> Value {
    json!({
        "Type": "AWS::Connect::ContactFlow",
        "Properties": {
            "Content": content,
            "InstanceArn": instance_arn,
            "Description": flow.kind.description(),
            "Name": flow.name,
            "Type": "CONTACT_FLOW",
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicedeploy_flows::FlowKind;
    use voicedeploy_store::{AgentRecord, TimeSlice};

    fn flow(kind: FlowKind, content: &str) -> ResolvedFlow {
        ResolvedFlow {
            kind,
            name: kind.flow_name("Acme"),
            path: PathBuf::from(kind.resolved_file()),
            content: content.to_string(),
        }
    }

    fn inputs(agents: usize, screenpop: bool) -> StackInputs {
        let records = (0..agents)
            .map(|i| AgentRecord {
                username: format!("agent{}", i),
                first_name: "Ann".to_string(),
                last_name: "Lee".to_string(),
                password: "Passw0rd!".to_string(),
            })
            .collect();

        StackInputs {
            tenant_name: "Acme".to_string(),
            instance: InstanceReference {
                id: "inst-1".to_string(),
                arn: "arn:aws:connect:us-east-1:123456789012:instance/inst-1".to_string(),
            },
            security_profile: SecurityProfileReference {
                id: "sp-1".to_string(),
                arn: "arn:sp".to_string(),
                name: "Agent".to_string(),
            },
            hours: HoursOfOperation {
                name: "Office Hours".to_string(),
                description: "Weekdays".to_string(),
                time_zone: "America/New_York".to_string(),
                timeslices: vec![TimeSlice {
                    day: "MONDAY".to_string(),
                    start_h: 9,
                    start_m: 0,
                    end_h: 17,
                    end_m: 30,
                }],
            },
            flows: ResolvedFlows {
                screenpop: screenpop.then(|| flow(FlowKind::ScreenPop, "{\"Actions\":[]}")),
                survey: None,
                inbound: flow(FlowKind::Inbound, "{\"queue\":\"${Queue.QueueArn}\"}"),
            },
            agents: AgentRoster::new(records),
        }
    }

    #[test]
    fn test_one_user_per_roster_row() {
        let template = StackTemplate::synthesize(&inputs(3, false));
        // hours, queue, inbound, routing profile, 3 users
        assert_eq!(template.resource_count(), 7);
        assert!(template.resource("Agent3").is_some());
        assert!(template.resource("Agent4").is_none());

        let user = template.resource("Agent1").unwrap();
        assert_eq!(user["Properties"]["Username"], "agent0");
        assert_eq!(user["Properties"]["SecurityProfileArns"][0], "arn:sp");
        assert_eq!(user["Properties"]["PhoneConfig"]["AutoAccept"], false);
    }

    #[test]
    fn test_inbound_content_uses_fn_sub() {
        let template = StackTemplate::synthesize(&inputs(0, true));
        let inbound = template.resource("InboundFlow").unwrap();
        assert_eq!(
            inbound["Properties"]["Content"]["Fn::Sub"],
            "{\"queue\":\"${Queue.QueueArn}\"}"
        );
        assert_eq!(inbound["Properties"]["Name"], "Acme Inbound Flow");

        let leaf = template.resource("ScreenPopFlow").unwrap();
        assert!(leaf["Properties"]["Content"].is_string());
    }

    #[test]
    fn test_hours_and_queue_naming() {
        let template = StackTemplate::synthesize(&inputs(0, false));
        let hours = template.resource("HoursOfOperation").unwrap();
        assert_eq!(hours["Properties"]["Name"], "Acme Office Hours");
        assert_eq!(hours["Properties"]["Config"][0]["EndTime"]["Minutes"], 30);

        let queue = template.resource("Queue").unwrap();
        assert_eq!(queue["Properties"]["Name"], "Acme Queue");
        assert_eq!(
            queue["Properties"]["HoursOfOperationArn"]["Fn::GetAtt"][0],
            "HoursOfOperation"
        );
    }

    #[test]
    fn test_write_to_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let template = StackTemplate::synthesize(&inputs(1, false));
        let path = template.write(dir.path()).unwrap();

        assert_eq!(path, dir.path().join(TEMPLATE_FILE));
        let content = std::fs::read_to_string(path).unwrap();
        assert!(!content.contains('\n'));
        let parsed: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(&parsed, template.body());
    }

    #[test]
    fn test_large_roster_outgrows_inline_limit() {
        assert!(StackTemplate::synthesize(&inputs(2, true)).fits_inline());

        let large = StackTemplate::synthesize(&inputs(400, true));
        assert!(!large.fits_inline());
        assert!(large.encode().unwrap().len() > INLINE_TEMPLATE_LIMIT);
    }
}
