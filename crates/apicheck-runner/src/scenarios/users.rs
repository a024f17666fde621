//! `GET /api/test/users?gender=..`

use futures::FutureExt;

use apicheck_core::{
    Aggregator, ContractResultExt, Contribution, EndpointTarget, HttpMethod, ResponseRecord,
    ScenarioError,
};

use super::user::user_target;
use super::{Scenario, ScenarioContext, USERS_PATH};
use crate::contract::{
    ContractLimits, error_contract, expect_filter_match, expect_present, expect_value, id_list,
    method_not_allowed_contract, missing_parameter_contract, required_user, success_contract,
};

fn by_gender(gender: &str) -> EndpointTarget {
    EndpointTarget::get(USERS_PATH).with_query("gender", gender)
}

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("gender lists partition the directory", USERS_PATH, 4, |ctx| {
            partition(ctx).boxed()
        }),
        Scenario::new("female users in Novosibirsk", USERS_PATH, 2, |ctx| {
            filtered_user(ctx, "female", "city", "Novosibirsk").boxed()
        }),
        Scenario::new("male users named Gogol", USERS_PATH, 2, |ctx| {
            filtered_user(ctx, "male", "name", "Gogol").boxed()
        }),
        Scenario::new("users aged 18", USERS_PATH, 2, |ctx| {
            filtered_user(ctx, "any", "age", "18").boxed()
        }),
        Scenario::new("empty gender is rejected", USERS_PATH, 1, |ctx| {
            empty_gender(ctx).boxed()
        }),
        Scenario::new("unlisted gender returns a list", USERS_PATH, 1, |ctx| {
            unlisted_gender(ctx).boxed()
        }),
        Scenario::new("missing gender is rejected", USERS_PATH, 1, |ctx| {
            missing_gender(ctx, EndpointTarget::get(USERS_PATH)).boxed()
        }),
        Scenario::new("city without gender is rejected", USERS_PATH, 1, |ctx| {
            missing_gender(ctx, EndpointTarget::get(USERS_PATH).with_query("city", "Moscow"))
                .boxed()
        }),
        Scenario::new("post on users is not allowed", USERS_PATH, 1, |ctx| {
            post_users(ctx).boxed()
        }),
        Scenario::new("sql fragment gender is rejected", USERS_PATH, 1, |ctx| {
            injected_gender(ctx).boxed()
        }),
        Scenario::new("plain http users request is served", USERS_PATH, 1, |ctx| {
            plain_http_users(ctx).boxed()
        }),
    ]
}

fn listed(record: &ResponseRecord, limits: &ContractLimits) -> Result<Vec<i64>, ScenarioError> {
    let step = record.label();
    success_contract(record, limits).at(step)?;
    id_list(record).at(step)
}

/// Two `any` reads agree, and `male`/`female` split a subset of `any`.
async fn partition(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let (any_query, male_query, female_query) =
        (by_gender("any"), by_gender("male"), by_gender("female"));
    let (any_first, any_repeat, male, female) = tokio::try_join!(
        ctx.call(&any_query),
        ctx.call(&any_query),
        ctx.call(&male_query),
        ctx.call(&female_query),
    )?;

    let limits = ctx.limits();
    let mut lists = Aggregator::expecting(["any", "any repeat", "male", "female"]);
    lists.contribute("any", Contribution::Ids(listed(&any_first, limits)?))?;
    lists.contribute("any repeat", Contribution::Ids(listed(&any_repeat, limits)?))?;
    lists.contribute("male", Contribution::Ids(listed(&male, limits)?))?;
    lists.contribute("female", Contribution::Ids(listed(&female, limits)?))?;

    let lists = lists.seal()?;
    lists.repeatable("any", "any repeat")?;
    lists.subset("male", "any")?;
    lists.subset("female", "any")?;
    lists.disjoint("male", "female")?;
    Ok(())
}

/// Sample one id from a filtered list and confirm the user matches the filter.
async fn filtered_user(
    ctx: &mut ScenarioContext,
    gender: &'static str,
    field: &'static str,
    value: &'static str,
) -> Result<(), ScenarioError> {
    let list = ctx
        .call(&by_gender(gender).with_query(field, value))
        .await?;
    let ids = listed(&list, ctx.limits())?;
    let id = ctx.sample(&ids, &format!("idList of {}", list.label()))?;

    let record = ctx.call(&user_target(&id.to_string())).await?;
    let step = record.label();
    success_contract(&record, ctx.limits()).at(step)?;
    let user = required_user(&record).at(step)?;
    expect_value("user.id", user.get("id"), &id.into()).at(step)?;
    if gender != "any" {
        expect_filter_match("user.gender", user.get("gender"), gender).at(step)?;
    }
    expect_filter_match(&format!("user.{field}"), user.get(field), value).at(step)
}

async fn empty_gender(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let record = ctx.call(&by_gender("")).await?;
    error_contract(&record, ctx.limits()).at(record.label())
}

async fn unlisted_gender(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let record = ctx.call(&by_gender("nonbinary")).await?;
    listed(&record, ctx.limits()).map(drop)
}

async fn missing_gender(ctx: &mut ScenarioContext, target: EndpointTarget) -> Result<(), ScenarioError> {
    let record = ctx.call(&target).await?;
    missing_parameter_contract(&record, ctx.limits(), "gender").at(record.label())
}

async fn post_users(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let target = EndpointTarget::new(HttpMethod::Post, USERS_PATH).with_query("gender", "any");
    let record = ctx.call(&target).await?;
    method_not_allowed_contract(&record, ctx.limits(), HttpMethod::Post, "idList")
        .at(record.label())
}

async fn injected_gender(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let record = ctx.call(&by_gender(" or 1=1 --")).await?;
    let step = record.label();
    error_contract(&record, ctx.limits()).at(step)?;
    expect_present(&record, "error").at(step)
}

async fn plain_http_users(ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
    let record = ctx.call(&by_gender("any").over_plain_http()).await?;
    listed(&record, ctx.limits()).map(drop)
}
