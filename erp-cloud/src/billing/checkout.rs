//! Checkout preference creation

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;
use shared::billing::{ExternalReference, Payment, PaymentStatus};
use shared::error::{AppError, ErrorCode};

use super::require_member;
use crate::auth::Principal;
use crate::config::Config;
use crate::db::BillingStore;
use crate::error::ServiceResult;
use crate::mercadopago::{
    BackUrls, Payer, PaymentGateway, PreferenceItem, PreferenceMetadata, PreferenceRequest,
};

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Public base URL, no trailing slash
    pub base_url: String,
    pub sandbox: bool,
    pub default_currency: String,
    pub access_token_configured: bool,
}

impl CheckoutSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.app_base_url.clone(),
            sandbox: config.mp_sandbox,
            default_currency: config.default_currency.clone(),
            access_token_configured: config.mp_access_token.is_some(),
        }
    }
}

/// Where to send the buyer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutSession {
    pub preference_id: String,
    pub url: String,
}

/// Create a processor checkout preference for `plan_id` and record a pending
/// payment. All validation happens before the processor is called.
pub async fn create_checkout(
    store: &dyn BillingStore,
    gateway: &dyn PaymentGateway,
    principal: &Principal,
    company_id: &str,
    plan_id: &str,
    settings: &CheckoutSettings,
    now: i64,
) -> ServiceResult<CheckoutSession> {
    if plan_id.trim().is_empty() {
        return Err(AppError::required("plan_id").into());
    }

    let plan = store.find_plan(plan_id).await?.ok_or_else(|| {
        AppError::with_message(ErrorCode::PlanNotFound, format!("Plan {plan_id} not found"))
            .with_detail("plan_id", plan_id)
    })?;
    if !plan.active {
        return Err(AppError::new(ErrorCode::PlanInactive)
            .with_detail("plan_id", plan_id)
            .into());
    }
    if !plan.price.is_finite() || plan.price <= 0.0 {
        return Err(AppError::new(ErrorCode::PlanInvalidPrice)
            .with_detail("plan_id", plan_id)
            .into());
    }
    let currency = if plan.currency.trim().is_empty() {
        settings.default_currency.trim().to_string()
    } else {
        plan.currency.trim().to_string()
    };
    if currency.is_empty() {
        return Err(AppError::new(ErrorCode::CurrencyRequired).into());
    }
    if !settings.access_token_configured {
        return Err(AppError::new(ErrorCode::PaymentProviderNotConfigured).into());
    }

    let (company, _membership) = require_member(store, principal, company_id).await?;

    let amount = Decimal::from_f64(plan.price)
        .map(|d| d.round_dp(2))
        .ok_or_else(|| AppError::new(ErrorCode::PlanInvalidPrice))?;

    let reference = ExternalReference {
        company_id: company.id.clone(),
        plan_id: plan.id.clone(),
        created_at: now,
    }
    .to_string();

    let base = &settings.base_url;
    let request = PreferenceRequest {
        items: vec![PreferenceItem {
            id: plan.id.clone(),
            title: format!("{} - {}", plan.name, company.name),
            quantity: 1,
            currency_id: currency.clone(),
            unit_price: plan.price,
        }],
        payer: Payer {
            email: principal.email.clone(),
        },
        back_urls: BackUrls {
            success: format!("{base}/dashboard/billing?status=success"),
            failure: format!("{base}/dashboard/billing?status=failure"),
            pending: format!("{base}/dashboard/billing?status=pending"),
        },
        auto_return: "approved".into(),
        notification_url: format!("{base}/api/webhooks/mercadopago"),
        external_reference: reference.clone(),
        metadata: PreferenceMetadata {
            company_id: company.id.clone(),
            plan_id: plan.id.clone(),
            user_id: principal.user_id.clone(),
        },
    };

    let preference = gateway.create_preference(&request).await?;

    let payment = Payment {
        id: uuid::Uuid::new_v4().to_string(),
        company_id: company.id.clone(),
        plan_id: plan.id.clone(),
        preference_id: preference.id.clone(),
        external_payment_id: None,
        amount,
        currency,
        status: PaymentStatus::Pending,
        payment_type: None,
        external_reference: reference,
        created_at: now,
        updated_at: now,
    };
    // Not rolled back if this fails: the preference already exists upstream
    store.insert_payment(&payment).await?;

    tracing::info!(
        company_id = %company.id,
        plan_id = %plan.id,
        preference_id = %preference.id,
        "Checkout preference created"
    );
    let detail = serde_json::json!({ "plan_id": plan.id, "preference_id": preference.id });
    store
        .audit(&company.id, "checkout_created", Some(&detail), now)
        .await?;

    let url = match (settings.sandbox, preference.sandbox_init_point) {
        (true, Some(sandbox_url)) => sandbox_url,
        _ => preference.init_point,
    };

    Ok(CheckoutSession {
        preference_id: preference.id,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::fixtures::{self, NOW, principal};
    use crate::db::InMemoryStore;
    use crate::mercadopago::testing::FakeGateway;
    use shared::billing::Plan;

    fn settings() -> CheckoutSettings {
        CheckoutSettings {
            base_url: "https://erp.example.com".into(),
            sandbox: false,
            default_currency: "ARS".into(),
            access_token_configured: true,
        }
    }

    async fn store_with(edit: impl FnOnce(&mut Plan)) -> InMemoryStore {
        let base = fixtures::store().await;
        let mut plans = crate::billing::catalog::default_plans("ARS");
        if let Some(pro) = plans.iter_mut().find(|p| p.id == "pro") {
            edit(pro);
        }
        let store = InMemoryStore::new(plans);
        store
            .insert_company(base.find_company("c1").await.unwrap().unwrap())
            .await;
        store
            .insert_membership(base.find_membership("c1", "admin").await.unwrap().unwrap())
            .await;
        store
    }

    async fn run(
        store: &InMemoryStore,
        gateway: &FakeGateway,
        plan_id: &str,
        settings: &CheckoutSettings,
    ) -> Result<CheckoutSession, AppError> {
        create_checkout(
            store,
            gateway,
            &principal("admin"),
            "c1",
            plan_id,
            settings,
            NOW,
        )
        .await
        .map_err(AppError::from)
    }

    #[tokio::test]
    async fn builds_preference_and_records_pending_payment() {
        let store = fixtures::store().await;
        let gateway = FakeGateway::default();
        let session = run(&store, &gateway, "pro", &settings()).await.unwrap();

        assert_eq!(session.preference_id, "pref-1");
        assert_eq!(session.url, "https://mp.test/checkout/pref-1");

        let req = gateway.last_request().unwrap();
        assert_eq!(req.items.len(), 1);
        assert_eq!(req.items[0].quantity, 1);
        assert_eq!(req.items[0].currency_id, "ARS");
        assert_eq!(req.items[0].unit_price, 19999.0);
        assert_eq!(req.payer.email, "admin@example.com");
        assert_eq!(
            req.back_urls.success,
            "https://erp.example.com/dashboard/billing?status=success"
        );
        assert_eq!(
            req.notification_url,
            "https://erp.example.com/api/webhooks/mercadopago"
        );
        assert_eq!(req.external_reference, format!("c1|pro|{NOW}"));
        assert_eq!(req.metadata.user_id, "admin");

        let payments = store.payments().await;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Pending);
        assert_eq!(payments[0].preference_id, "pref-1");
        assert_eq!(payments[0].amount, Decimal::new(1_999_900, 2));
        assert_eq!(payments[0].external_reference, req.external_reference);
    }

    #[tokio::test]
    async fn sandbox_uses_sandbox_url() {
        let store = fixtures::store().await;
        let gateway = FakeGateway::default();
        let mut s = settings();
        s.sandbox = true;
        let session = run(&store, &gateway, "basic", &s).await.unwrap();
        assert_eq!(session.url, "https://sandbox.mp.test/checkout/pref-1");
    }

    #[tokio::test]
    async fn invalid_prices_never_reach_processor() {
        for price in [0.0, f64::NAN, -10.0] {
            let store = store_with(|p| p.price = price).await;
            let gateway = FakeGateway::default();
            let err = run(&store, &gateway, "pro", &settings()).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::PlanInvalidPrice, "price {price}");
            assert_eq!(err.http_status(), http::StatusCode::BAD_REQUEST);
            assert_eq!(gateway.calls(), 0);
            assert!(store.payments().await.is_empty());
        }
    }

    #[tokio::test]
    async fn unknown_and_inactive_plans_are_rejected() {
        let store = store_with(|p| p.active = false).await;
        let gateway = FakeGateway::default();

        let err = run(&store, &gateway, "gold", &settings()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PlanNotFound);
        let err = run(&store, &gateway, "pro", &settings()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PlanInactive);
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn currency_falls_back_to_default() {
        let store = store_with(|p| p.currency = String::new()).await;
        let gateway = FakeGateway::default();
        let mut s = settings();
        s.default_currency = "USD".into();
        run(&store, &gateway, "pro", &s).await.unwrap();
        assert_eq!(gateway.last_request().unwrap().items[0].currency_id, "USD");

        s.default_currency = String::new();
        let err = run(&store, &gateway, "pro", &s).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CurrencyRequired);
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn missing_access_token_is_config_error() {
        let store = fixtures::store().await;
        let gateway = FakeGateway::default();
        let mut s = settings();
        s.access_token_configured = false;
        let err = run(&store, &gateway, "pro", &s).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentProviderNotConfigured);
        assert_eq!(err.http_status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn non_members_cannot_check_out() {
        let store = fixtures::store().await;
        let gateway = FakeGateway::default();
        let err: AppError = create_checkout(
            &store,
            &gateway,
            &principal("outsider"),
            "c1",
            "pro",
            &settings(),
            NOW,
        )
        .await
        .unwrap_err()
        .into();
        assert_eq!(err.code, ErrorCode::NotCompanyMember);
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn processor_failure_is_bad_gateway_without_payment_row() {
        let store = fixtures::store().await;
        let gateway = FakeGateway::failing("invalid access token");
        let err = run(&store, &gateway, "pro", &settings()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentSetupFailed);
        assert_eq!(err.message, "invalid access token");
        assert_eq!(err.http_status(), http::StatusCode::BAD_GATEWAY);
        assert!(store.payments().await.is_empty());
    }
}
