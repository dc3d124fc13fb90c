//! Default plan catalog and trial plan selection

use shared::billing::{Feature, Plan, PlanInterval};

fn plan(
    id: &str,
    name: &str,
    description: &str,
    price: f64,
    currency: &str,
    features: &[Feature],
    sort_order: i32,
) -> Plan {
    Plan {
        id: id.into(),
        name: name.into(),
        description: Some(description.into()),
        price,
        currency: currency.into(),
        interval: PlanInterval::Month,
        features: features.iter().map(|f| f.key().to_string()).collect(),
        active: true,
        sort_order,
    }
}

/// Seed catalog, mirrored by the initial migration
pub fn default_plans(currency: &str) -> Vec<Plan> {
    use Feature::*;
    let core = [Inventory, Sales, Repairs];
    let pro = [Inventory, Sales, Repairs, Billing, SupportTickets, Reports];

    vec![
        plan("trial", "Trial", "14-day free trial", 0.0, currency, &core, 0),
        plan(
            "basic",
            "Basic",
            "Inventory, sales and repairs",
            9999.0,
            currency,
            &core,
            1,
        ),
        plan(
            "pro",
            "Pro",
            "Adds invoicing, support tickets and reports",
            19999.0,
            currency,
            &pro,
            2,
        ),
        plan(
            "enterprise",
            "Enterprise",
            "Multiple branches and API access",
            39999.0,
            currency,
            &Feature::ALL,
            3,
        ),
    ]
}

/// Pick the plan handed out as a trial.
///
/// An active plan named "trial" (any case) wins; otherwise the active
/// zero-priced plan with the lowest `sort_order`.
pub fn select_trial_plan(plans: &[Plan]) -> Option<&Plan> {
    plans
        .iter()
        .find(|p| p.active && p.name.eq_ignore_ascii_case("trial"))
        .or_else(|| {
            plans
                .iter()
                .filter(|p| p.active && p.is_free())
                .min_by_key(|p| p.sort_order)
        })
}
