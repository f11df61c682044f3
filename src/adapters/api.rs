use std::collections::BTreeMap;

use actix_web::{HttpResponse, Responder, get, post, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::app::services::{
    ServiceError, SqliteWalletService, WalletCommandHandler, WalletQueryHandler,
};
use crate::domain::clock::to_iso8601;
use crate::domain::dashboard::{
    DashboardMetrics, DashboardStats, calculate_dashboard_stats, format_power_output,
    format_revenue, format_time_ago,
};
use crate::domain::filters::{
    ConfidenceLevel, Insight, InsightFilter, TransactionFilter, confidence_level,
    filter_insights,
};
use crate::domain::policy::{
    RouteConfig, calculate_session_timeout, get_route_config, has_route_access,
    should_require_2fa,
};
use crate::domain::transaction::{
    DisplayConfig, Transaction, TransactionStatus, TransactionType, can_process_payment,
    get_transaction_status_config, get_transaction_type_config, is_refund_eligible,
    validate_transaction_amount,
};
use crate::domain::validation::{
    FormValidation, ValidationResult, validate_create_user_form, validate_login_form,
};

#[derive(Clone)]
pub struct ApiState {
    pub wallets: SqliteWalletService,
}

#[derive(Debug, Deserialize)]
pub struct LoginFormRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserFormRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCheckRequest {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub balance: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TransactionMetadataResponse {
    pub types: BTreeMap<&'static str, DisplayConfig>,
    pub statuses: BTreeMap<&'static str, DisplayConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatsResponse {
    pub stats: DashboardStats,
    pub formatted_revenue: String,
    pub formatted_power_output: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePolicyResponse {
    pub role: String,
    pub session_timeout_ms: u64,
    pub requires_2fa: bool,
}

#[derive(Debug, Deserialize)]
pub struct RouteAccessQuery {
    pub role: String,
    pub route: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAccessResponse {
    pub role: String,
    pub route: String,
    pub allowed: bool,
    pub config: Option<&'static RouteConfig>,
}

#[derive(Debug, Deserialize)]
pub struct InsightFilterRequest {
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub filter: InsightFilter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightResponse {
    #[serde(flatten)]
    pub insight: Insight,
    pub confidence_level: ConfidenceLevel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub wallet_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: f64,
    pub station_name: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: String,
    pub wallet_id: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    pub station_name: Option<String>,
    pub reference_id: Option<String>,
    pub created_at: String,
    pub time_ago: String,
    pub refund_eligible: bool,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsDbResponse {
    pub schema_version: u32,
    pub transactions_count: i64,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(validate_login_endpoint)
        .service(validate_user_endpoint)
        .service(validate_transaction_endpoint)
        .service(transaction_metadata_endpoint)
        .service(dashboard_stats_endpoint)
        .service(role_policy_endpoint)
        .service(route_access_endpoint)
        .service(filter_insights_endpoint)
        .service(wallet_balance_endpoint)
        .service(list_wallet_transactions_endpoint)
        .service(top_up_endpoint)
        .service(payment_endpoint)
        .service(get_transaction_endpoint)
        .service(refund_endpoint)
        .service(get_db_diagnostics_endpoint);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[post("/validation/login")]
async fn validate_login_endpoint(body: web::Json<LoginFormRequest>) -> impl Responder {
    let result: FormValidation = validate_login_form(&body.email, &body.password);
    HttpResponse::Ok().json(result)
}

#[post("/validation/users")]
async fn validate_user_endpoint(body: web::Json<CreateUserFormRequest>) -> impl Responder {
    let result = validate_create_user_form(&body.name, &body.email, &body.password, &body.role);
    HttpResponse::Ok().json(result)
}

#[post("/validation/transactions")]
async fn validate_transaction_endpoint(
    body: web::Json<TransactionCheckRequest>,
) -> impl Responder {
    let outcome = match body.balance {
        Some(balance) => can_process_payment(body.transaction_type, body.amount, balance),
        None => validate_transaction_amount(body.transaction_type, body.amount),
    };

    HttpResponse::Ok().json(ValidationResult::from(outcome))
}

#[get("/transactions/metadata")]
async fn transaction_metadata_endpoint() -> impl Responder {
    HttpResponse::Ok().json(TransactionMetadataResponse {
        types: TransactionType::ALL
            .into_iter()
            .map(|kind| (kind.as_str(), get_transaction_type_config(kind)))
            .collect(),
        statuses: TransactionStatus::ALL
            .into_iter()
            .map(|status| (status.as_str(), get_transaction_status_config(status)))
            .collect(),
    })
}

#[post("/dashboard/stats")]
async fn dashboard_stats_endpoint(body: web::Json<DashboardMetrics>) -> impl Responder {
    HttpResponse::Ok().json(DashboardStatsResponse {
        stats: calculate_dashboard_stats(&body),
        formatted_revenue: format_revenue(body.daily_revenue),
        formatted_power_output: format_power_output(body.power_output),
    })
}

#[get("/auth/roles/{role}/policy")]
async fn role_policy_endpoint(role: web::Path<String>) -> impl Responder {
    let role = role.into_inner();
    HttpResponse::Ok().json(RolePolicyResponse {
        session_timeout_ms: calculate_session_timeout(&role),
        requires_2fa: should_require_2fa(&role),
        role,
    })
}

#[get("/auth/route-access")]
async fn route_access_endpoint(query: web::Query<RouteAccessQuery>) -> impl Responder {
    let query = query.into_inner();
    HttpResponse::Ok().json(RouteAccessResponse {
        allowed: has_route_access(&query.role, &query.route),
        config: get_route_config(&query.route),
        role: query.role,
        route: query.route,
    })
}

#[post("/insights/filter")]
async fn filter_insights_endpoint(body: web::Json<InsightFilterRequest>) -> impl Responder {
    let mapped: Vec<InsightResponse> = filter_insights(&body.insights, &body.filter)
        .into_iter()
        .map(|insight| InsightResponse {
            confidence_level: confidence_level(insight.confidence),
            insight,
        })
        .collect();

    HttpResponse::Ok().json(mapped)
}

#[get("/wallets/{wallet_id}/balance")]
async fn wallet_balance_endpoint(
    state: web::Data<ApiState>,
    wallet_id: web::Path<String>,
) -> impl Responder {
    let wallet_id = wallet_id.into_inner();
    match state.wallets.wallet_balance(&wallet_id) {
        Ok(balance) => HttpResponse::Ok().json(BalanceResponse { wallet_id, balance }),
        Err(error) => service_error_response(error),
    }
}

#[get("/wallets/{wallet_id}/transactions")]
async fn list_wallet_transactions_endpoint(
    state: web::Data<ApiState>,
    wallet_id: web::Path<String>,
    query: web::Query<TransactionFilter>,
) -> impl Responder {
    match state.wallets.list_transactions(&wallet_id, &query) {
        Ok(transactions) => {
            let mapped: Vec<TransactionResponse> = transactions
                .into_iter()
                .map(|transaction| to_response(&state.wallets, transaction))
                .collect();
            HttpResponse::Ok().json(mapped)
        }
        Err(error) => service_error_response(error),
    }
}

#[post("/wallets/{wallet_id}/top-ups")]
async fn top_up_endpoint(
    state: web::Data<ApiState>,
    wallet_id: web::Path<String>,
    body: web::Json<TopUpRequest>,
) -> impl Responder {
    match state.wallets.top_up(&wallet_id, body.amount) {
        Ok(transaction) => {
            HttpResponse::Created().json(to_response(&state.wallets, transaction))
        }
        Err(error) => service_error_response(error),
    }
}

#[post("/wallets/{wallet_id}/payments")]
async fn payment_endpoint(
    state: web::Data<ApiState>,
    wallet_id: web::Path<String>,
    body: web::Json<PaymentRequest>,
) -> impl Responder {
    match state
        .wallets
        .pay_for_charging(&wallet_id, body.amount, body.station_name.as_deref())
    {
        Ok(transaction) => {
            HttpResponse::Created().json(to_response(&state.wallets, transaction))
        }
        Err(error) => service_error_response(error),
    }
}

#[get("/transactions/{transaction_id}")]
async fn get_transaction_endpoint(
    state: web::Data<ApiState>,
    transaction_id: web::Path<String>,
) -> impl Responder {
    match state.wallets.get_transaction(&transaction_id) {
        Ok(Some(transaction)) => HttpResponse::Ok().json(to_response(&state.wallets, transaction)),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("transaction {transaction_id} not found")
        })),
        Err(error) => service_error_response(error),
    }
}

#[post("/transactions/{transaction_id}/refund")]
async fn refund_endpoint(
    state: web::Data<ApiState>,
    transaction_id: web::Path<String>,
) -> impl Responder {
    match state.wallets.refund(&transaction_id) {
        Ok(transaction) => {
            HttpResponse::Created().json(to_response(&state.wallets, transaction))
        }
        Err(error) => service_error_response(error),
    }
}

#[get("/diagnostics/db")]
async fn get_db_diagnostics_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let schema_version = match state.wallets.get_schema_version() {
        Ok(value) => value,
        Err(error) => return service_error_response(error),
    };
    let transactions_count = match state.wallets.count_transactions() {
        Ok(value) => value,
        Err(error) => return service_error_response(error),
    };

    HttpResponse::Ok().json(DiagnosticsDbResponse {
        schema_version,
        transactions_count,
    })
}

fn to_response(wallets: &SqliteWalletService, transaction: Transaction) -> TransactionResponse {
    let now = wallets.now();

    TransactionResponse {
        time_ago: format_time_ago(transaction.created_at, now),
        refund_eligible: is_refund_eligible(&transaction, wallets.refund_window_hours(), now),
        created_at: to_iso8601(transaction.created_at),
        id: transaction.id,
        wallet_id: transaction.wallet_id,
        transaction_type: transaction.transaction_type,
        status: transaction.status,
        amount: transaction.amount,
        description: transaction.description,
        station_name: transaction.station_name,
        reference_id: transaction.reference_id,
    }
}

fn service_error_response(error: ServiceError) -> HttpResponse {
    let message = error.to_string();
    match error {
        ServiceError::Rejected(_) => {
            HttpResponse::UnprocessableEntity().json(serde_json::json!({ "error": message }))
        }
        ServiceError::TransactionNotFound(_) => {
            HttpResponse::NotFound().json(serde_json::json!({ "error": message }))
        }
        ServiceError::RefundNotEligible(_) | ServiceError::AlreadyRefunded(_) => {
            HttpResponse::Conflict().json(serde_json::json!({ "error": message }))
        }
        ServiceError::DbLockPoisoned | ServiceError::Database(_) => {
            tracing::error!(error = %message, "wallet storage failure");
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": message }))
        }
    }
}
