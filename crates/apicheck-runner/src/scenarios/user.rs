//! `GET /api/test/user/{id}`

use futures::FutureExt;
use serde_json::{Value, json};

use apicheck_core::{
    Aggregator, ContractResultExt, Contribution, EndpointTarget, HttpMethod, IdentifierClass,
    ScenarioError, classify,
};

use super::{Scenario, ScenarioContext, USER_PATH};
use crate::contract::{
    error_contract, expect_field, expect_present, expect_value, malformed_id_contract,
    method_not_allowed_contract, not_found_contract, required_user, success_contract,
};

/// Valid id that no user owns.
const UNKNOWN_ID: &str = "9";

pub(super) fn user_target(id: &str) -> EndpointTarget {
    EndpointTarget::get(USER_PATH).with_path_param("id", id)
}

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("existing id is repeatable", USER_PATH, 2, |ctx| {
            existing_id(ctx).boxed()
        }),
        Scenario::new("unknown id returns null user", USER_PATH, 1, |ctx| {
            unknown_id(ctx).boxed()
        }),
        Scenario::new("fractional id is rejected", USER_PATH, 1, |ctx| {
            malformed_id(ctx, "9.99999").boxed()
        }),
        Scenario::new("negative id is rejected", USER_PATH, 1, |ctx| {
            malformed_id(ctx, "-10").boxed()
        }),
        Scenario::new("overflowing id is rejected", USER_PATH, 1, |ctx| {
            malformed_id(ctx, "99999999999").boxed()
        }),
        Scenario::new("null id is rejected", USER_PATH, 1, |ctx| {
            malformed_id(ctx, "null").boxed()
        }),
        Scenario::new("zero id is rejected", USER_PATH, 1, |ctx| {
            malformed_id(ctx, "0").boxed()
        }),
        Scenario::new("alphabetic id is rejected", USER_PATH, 1, |ctx| {
            malformed_id(ctx, "string").boxed()
        }),
        Scenario::new("whitespace id is not found", USER_PATH, 1, |ctx| {
            whitespace_id(ctx).boxed()
        }),
        Scenario::new("quoted id is rejected", USER_PATH, 1, |ctx| {
            quoted_id(ctx).boxed()
        }),
        Scenario::new("sql fragment id is rejected", USER_PATH, 1, |ctx| {
            injected_id(ctx).boxed()
        }),
        Scenario::new("post on user is not allowed", USER_PATH, 1, |ctx| {
            post_user(ctx).boxed()
        }),
        Scenario::new("bogus content-type header is ignored", USER_PATH, 1, |ctx| {
            bogus_header(ctx).boxed()
        }),
        Scenario::new("plain http user request is served", USER_PATH, 1, |ctx| {
            plain_http_user(ctx).boxed()
        }),
    ]
}

/// Fixture id resolves to itself, and a second read is byte-identical.
async fn existing_id(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let id = ctx.fixture_id();
    let target = user_target(&id.to_string());

    let first = ctx.call(&target).await?;
    let step = first.label();
    success_contract(&first, ctx.limits()).at(step)?;
    let user = required_user(&first).at(step)?;
    expect_value("user.id", user.get("id"), &json!(id)).at(step)?;

    let repeat = ctx.call(&target).await?;
    success_contract(&repeat, ctx.limits()).at(repeat.label())?;

    let mut reads = Aggregator::expecting(["first", "repeat"]);
    reads.contribute("first", Contribution::Body(first.raw_body().to_string()))?;
    reads.contribute("repeat", Contribution::Body(repeat.raw_body().to_string()))?;
    reads.seal()?.repeatable("first", "repeat")?;
    Ok(())
}

async fn unknown_id(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let record = ctx.call(&user_target(UNKNOWN_ID)).await?;
    let step = record.label();
    success_contract(&record, ctx.limits()).at(step)?;
    expect_field(&record, "user", &Value::Null).at(step)
}

async fn malformed_id(ctx: &mut ScenarioContext, token: &'static str) -> Result<(), ScenarioError> {
    if classify(token) != IdentifierClass::Malformed {
        return Err(ScenarioError::Setup(format!("{token:?} is not a malformed id")));
    }
    let record = ctx.call(&user_target(token)).await?;
    malformed_id_contract(&record, ctx.limits(), token).at(record.label())
}

async fn whitespace_id(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let token = " ";
    if classify(token) != IdentifierClass::Blank {
        return Err(ScenarioError::Setup(format!("{token:?} is not a blank id")));
    }
    let record = ctx.call(&user_target(token)).await?;
    not_found_contract(&record, ctx.limits()).at(record.label())
}

async fn quoted_id(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let id = format!("'{}'", ctx.fixture_id());
    let record = ctx.call(&user_target(&id)).await?;
    let step = record.label();
    error_contract(&record, ctx.limits()).at(step)?;
    expect_field(&record, "user", &Value::Null).at(step)?;
    expect_field(&record, "isSuccess", &Value::Bool(false)).at(step)
}

async fn injected_id(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let record = ctx.call(&user_target(" or 1=1 --")).await?;
    let step = record.label();
    error_contract(&record, ctx.limits()).at(step)?;
    expect_present(&record, "errorMessage").at(step)
}

async fn post_user(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let target = EndpointTarget::new(HttpMethod::Post, USER_PATH)
        .with_path_param("id", ctx.fixture_id().to_string());
    let record = ctx.call(&target).await?;
    method_not_allowed_contract(&record, ctx.limits(), HttpMethod::Post, "user").at(record.label())
}

async fn bogus_header(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let target = user_target(&ctx.fixture_id().to_string()).with_header("Content-Type", "0");
    let record = ctx.call(&target).await?;
    success_contract(&record, ctx.limits()).at(record.label())
}

async fn plain_http_user(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let target = user_target(&ctx.fixture_id().to_string()).over_plain_http();
    let record = ctx.call(&target).await?;
    success_contract(&record, ctx.limits()).at(record.label())
}
