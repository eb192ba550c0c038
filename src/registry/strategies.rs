//! Builtin resource strategies
//!
//! Values are fabricated deterministically from the resource's properties, the
//! context's pseudo-parameters and generated ids; nothing is looked up live.

use serde_json::Value;

use super::naming::{
    account_arn, arn, global_arn, physical_name, ref_string, required_string_property,
    resource_id, string_property,
};
use super::{unsupported_attribute, ResourceCall, ResourceRegistry, ResourceStrategy};
use crate::context::ResolvingContext;
use crate::error::ResolveError;

type Outcome = Result<Value, ResolveError>;

pub(super) fn register_builtin(registry: &mut ResourceRegistry) {
    let builtin: [(&str, ResourceStrategy); 10] = [
        ("AWS::S3::Bucket", strategy(bucket_ref, bucket_attribute)),
        ("AWS::SQS::Queue", strategy(queue_ref, queue_attribute)),
        ("AWS::SNS::Topic", strategy(topic_ref, topic_attribute)),
        ("AWS::Lambda::Function", strategy(function_ref, function_attribute)),
        ("AWS::IAM::Role", strategy(role_ref, role_attribute)),
        ("AWS::DynamoDB::Table", strategy(table_ref, table_attribute)),
        ("AWS::Logs::LogGroup", strategy(log_group_ref, log_group_attribute)),
        ("AWS::EC2::VPC", strategy(vpc_ref, vpc_attribute)),
        ("AWS::EC2::Subnet", strategy(subnet_ref, subnet_attribute)),
        ("AWS::EC2::SecurityGroup", strategy(security_group_ref, security_group_attribute)),
    ];
    for (resource_type, strategy) in builtin {
        registry.register(resource_type, strategy);
    }
}

fn strategy(reference: super::ReferenceFn, attribute: super::AttributeFn) -> ResourceStrategy {
    ResourceStrategy {
        reference,
        attribute,
    }
}

fn text(s: impl Into<String>) -> Outcome {
    Ok(Value::String(s.into()))
}

// S3

fn bucket_ref(call: &ResourceCall<'_>, ctx: &mut ResolvingContext<'_>) -> Outcome {
    text(physical_name(call, "BucketName", true, ctx)?)
}

fn bucket_attribute(call: &ResourceCall<'_>, attribute: &str, ctx: &mut ResolvingContext<'_>) -> Outcome {
    let name = ref_string(call, ctx)?;
    let suffix = ctx.url_suffix().to_string();
    let region = ctx.region().to_string();
    match attribute {
        "Arn" => text(global_arn(ctx, "s3", &name)),
        "DomainName" => text(format!("{}.s3.{}", name, suffix)),
        "RegionalDomainName" => text(format!("{}.s3.{}.{}", name, region, suffix)),
        "DualStackDomainName" => text(format!("{}.s3.dualstack.{}.{}", name, region, suffix)),
        "WebsiteURL" => text(format!("http://{}.s3-website-{}.{}", name, region, suffix)),
        _ => unsupported_attribute(call, attribute, ctx),
    }
}

// SQS: Ref yields the queue URL

fn queue_ref(call: &ResourceCall<'_>, ctx: &mut ResolvingContext<'_>) -> Outcome {
    let name = physical_name(call, "QueueName", false, ctx)?;
    text(format!(
        "https://sqs.{}.{}/{}/{}",
        ctx.region(),
        ctx.url_suffix(),
        ctx.account_id(),
        name
    ))
}

fn queue_attribute(call: &ResourceCall<'_>, attribute: &str, ctx: &mut ResolvingContext<'_>) -> Outcome {
    let url = ref_string(call, ctx)?;
    let name = url.rsplit('/').next().unwrap_or(&url).to_string();
    match attribute {
        "Arn" => text(arn(ctx, "sqs", &name)),
        "QueueName" => text(name),
        "QueueUrl" => text(url),
        _ => unsupported_attribute(call, attribute, ctx),
    }
}

// SNS: Ref yields the topic ARN

fn topic_ref(call: &ResourceCall<'_>, ctx: &mut ResolvingContext<'_>) -> Outcome {
    let name = physical_name(call, "TopicName", false, ctx)?;
    text(arn(ctx, "sns", &name))
}

fn topic_attribute(call: &ResourceCall<'_>, attribute: &str, ctx: &mut ResolvingContext<'_>) -> Outcome {
    let topic_arn = ref_string(call, ctx)?;
    match attribute {
        "TopicArn" => text(topic_arn),
        "TopicName" => text(topic_arn.rsplit(':').next().unwrap_or(&topic_arn)),
        _ => unsupported_attribute(call, attribute, ctx),
    }
}

// Lambda

fn function_ref(call: &ResourceCall<'_>, ctx: &mut ResolvingContext<'_>) -> Outcome {
    text(physical_name(call, "FunctionName", false, ctx)?)
}

fn function_attribute(call: &ResourceCall<'_>, attribute: &str, ctx: &mut ResolvingContext<'_>) -> Outcome {
    match attribute {
        "Arn" => {
            let name = ref_string(call, ctx)?;
            text(arn(ctx, "lambda", &format!("function:{}", name)))
        }
        _ => unsupported_attribute(call, attribute, ctx),
    }
}

// IAM

fn role_ref(call: &ResourceCall<'_>, ctx: &mut ResolvingContext<'_>) -> Outcome {
    text(physical_name(call, "RoleName", false, ctx)?)
}

fn role_attribute(call: &ResourceCall<'_>, attribute: &str, ctx: &mut ResolvingContext<'_>) -> Outcome {
    match attribute {
        "Arn" => {
            let name = ref_string(call, ctx)?;
            let path = string_property(call, "Path", ctx)?.unwrap_or_else(|| "/".to_string());
            text(account_arn(ctx, "iam", &format!("role{}{}", path, name)))
        }
        "RoleId" => {
            let seed = format!("{}/{}/RoleId", ctx.stack_name(), call.logical_id);
            text(ctx.generate_id(&seed, |hex| format!("AROA{}", hex.to_uppercase())))
        }
        _ => unsupported_attribute(call, attribute, ctx),
    }
}

// DynamoDB

fn table_ref(call: &ResourceCall<'_>, ctx: &mut ResolvingContext<'_>) -> Outcome {
    text(physical_name(call, "TableName", false, ctx)?)
}

fn table_attribute(call: &ResourceCall<'_>, attribute: &str, ctx: &mut ResolvingContext<'_>) -> Outcome {
    let name = ref_string(call, ctx)?;
    let table_arn = arn(ctx, "dynamodb", &format!("table/{}", name));
    match attribute {
        "Arn" => text(table_arn),
        "StreamArn" => text(format!("{}/stream/1970-01-01T00:00:00.000", table_arn)),
        _ => unsupported_attribute(call, attribute, ctx),
    }
}

// CloudWatch Logs

fn log_group_ref(call: &ResourceCall<'_>, ctx: &mut ResolvingContext<'_>) -> Outcome {
    text(physical_name(call, "LogGroupName", false, ctx)?)
}

fn log_group_attribute(call: &ResourceCall<'_>, attribute: &str, ctx: &mut ResolvingContext<'_>) -> Outcome {
    match attribute {
        "Arn" => {
            let name = ref_string(call, ctx)?;
            text(arn(ctx, "logs", &format!("log-group:{}:*", name)))
        }
        _ => unsupported_attribute(call, attribute, ctx),
    }
}

// EC2: Ref yields a generated resource id

fn vpc_ref(call: &ResourceCall<'_>, ctx: &mut ResolvingContext<'_>) -> Outcome {
    text(resource_id(call, "vpc", ctx))
}

fn vpc_attribute(call: &ResourceCall<'_>, attribute: &str, ctx: &mut ResolvingContext<'_>) -> Outcome {
    match attribute {
        "VpcId" => text(ref_string(call, ctx)?),
        "CidrBlock" => text(required_string_property(call, "CidrBlock", attribute, ctx)?),
        "DefaultSecurityGroup" => {
            let seed = format!("{}/{}/default-sg", ctx.stack_name(), call.logical_id);
            text(ctx.generate_id(&seed, |hex| format!("sg-{}", hex)))
        }
        _ => unsupported_attribute(call, attribute, ctx),
    }
}

fn subnet_ref(call: &ResourceCall<'_>, ctx: &mut ResolvingContext<'_>) -> Outcome {
    text(resource_id(call, "subnet", ctx))
}

fn subnet_attribute(call: &ResourceCall<'_>, attribute: &str, ctx: &mut ResolvingContext<'_>) -> Outcome {
    match attribute {
        "SubnetId" => text(ref_string(call, ctx)?),
        "AvailabilityZone" => match string_property(call, "AvailabilityZone", ctx)? {
            Some(zone) => text(zone),
            None => {
                let zones = ctx.availability_zones(None);
                zones.into_iter().next().map(Value::String).ok_or_else(|| {
                    ResolveError::lookup("Fn::GetAtt", "no availability zones configured")
                })
            }
        },
        "VpcId" => text(required_string_property(call, "VpcId", attribute, ctx)?),
        _ => unsupported_attribute(call, attribute, ctx),
    }
}

fn security_group_ref(call: &ResourceCall<'_>, ctx: &mut ResolvingContext<'_>) -> Outcome {
    text(resource_id(call, "sg", ctx))
}

fn security_group_attribute(
    call: &ResourceCall<'_>,
    attribute: &str,
    ctx: &mut ResolvingContext<'_>,
) -> Outcome {
    match attribute {
        "GroupId" => text(ref_string(call, ctx)?),
        "VpcId" => text(required_string_property(call, "VpcId", attribute, ctx)?),
        _ => unsupported_attribute(call, attribute, ctx),
    }
}
