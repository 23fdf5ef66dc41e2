// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{net::SocketAddr, str::FromStr, sync::Arc};

use anyhow::Result;
use axum::{error_handling::HandleError, http::StatusCode, routing::post_service, BoxError, Router};
use jsonrpsee::{
    core::async_trait,
    proc_macros::rpc,
    server::{stop_channel, ServerBuilder, ServerConfig, ServerHandle, TowerService},
};
use lazy_static::lazy_static;
use log::{error, info};
use prometheus::{register_int_counter, IntCounter};
use tokio::{net::TcpListener, signal, task::JoinHandle};
use tower::layer::util::Identity;
use vault_core::{
    feed::{FeedState, ReceiptFeed},
    issuance::{IssueRequest, IssuedReceipt, SubmissionMode, Submitter},
    manager::{
        adapters::{ContractReader, LocalStore, ReceiptSender, TransactionHistory, WalletProvider},
        SourceOutcome,
    },
    network,
    receipt::ReceiptRecord,
    session::{SessionManager, WalletSession},
    view::{filter_and_sort, ViewQuery},
    Error,
};

pub use crate::{
    api_versioning::{VaultRpcApiVersion, VaultRpcApiVersionsInfo},
    jsonrpsee_helpers::JsonRpcResponse,
};
use crate::{
    api_versioning::{vault_rpc_api_versions_info, VAULT_RPC_API_VERSIONS_DEPRECATED},
    error_codes::{JsonRpcErrorCode, JsonRpcWarningCode},
    jsonrpsee_helpers::{JsonRpcError, JsonRpcResult, JsonRpcWarning},
};

// Register the metrics into the global metrics registry.
lazy_static! {
    static ref RECEIPTS_ISSUED_COUNTER: IntCounter = register_int_counter!(
        "receipts_issued_count",
        "Number of receipts issued through the service."
    )
    .unwrap();
    static ref ISSUANCE_FAILURE_COUNTER: IntCounter = register_int_counter!(
        "issuance_failure_count",
        "Number of failed receipt issuance requests (for any reason)."
    )
    .unwrap();
    static ref REFRESH_REQUEST_COUNTER: IntCounter = register_int_counter!(
        "receipt_refresh_request_count",
        "Number of receipt list refreshes requested by clients."
    )
    .unwrap();
    static ref DEPRECATION_WARNING_COUNT: IntCounter = register_int_counter!(
        "deprecation_warning_count",
        "Number of deprecation warnings sent to clients."
    )
    .unwrap();
    static ref VERSION_ERROR_COUNT: IntCounter = register_int_counter!(
        "version_error_count",
        "Number of API version errors sent to clients."
    )
    .unwrap();
}

/// Generates the `RpcServer` trait that is used to define the JSON-RPC API.
///
/// Note that because of the way the `rpc` macro works, we cannot document the RpcServer trait here.
/// The JSON-RPC API is documented in `vault_service/README.md` instead; keep it in sync.
#[rpc(server)]
pub trait Rpc {
    /// Returns the versions of the vault JSON-RPC API implemented by this server.
    #[method(name = "api_versions")]
    fn api_versions(&self) -> JsonRpcResult<VaultRpcApiVersionsInfo>;

    /// Returns the current wallet session.
    #[method(name = "session_info")]
    fn session_info(&self) -> JsonRpcResult<WalletSession>;

    /// Connects the wallet, moving it to `chain_id` first when given.
    #[method(name = "connect_wallet")]
    async fn connect_wallet(
        &self,
        api_version: String,
        chain_id: Option<u64>,
    ) -> JsonRpcResult<WalletSession>;

    #[method(name = "disconnect_wallet")]
    fn disconnect_wallet(&self, api_version: String) -> JsonRpcResult<WalletSession>;

    /// Returns the displayed receipts matching `view`.
    #[method(name = "receipts_list")]
    fn receipts_list(
        &self,
        api_version: String,
        view: Option<ViewQuery>,
    ) -> JsonRpcResult<Vec<ReceiptRecord>>;

    /// Reconciles the receipts now and returns the displayed state.
    #[method(name = "receipts_refresh")]
    async fn receipts_refresh(&self, api_version: String) -> JsonRpcResult<FeedState>;

    /// Issues a receipt from the connected account.
    #[method(name = "receipts_issue")]
    async fn receipts_issue(
        &self,
        api_version: String,
        request: IssueRequest,
        mode: Option<SubmissionMode>,
    ) -> JsonRpcResult<IssuedReceipt>;

    /// Number of receipts the contract stores, `null` when it is not deployed.
    #[method(name = "receipts_count")]
    async fn receipts_count(&self, api_version: String) -> JsonRpcResult<Option<u64>>;

    /// Block explorer link for a transaction on the session's network.
    #[method(name = "explorer_url")]
    fn explorer_url(&self, api_version: String, tx_hash: String) -> JsonRpcResult<String>;
}

struct RpcImpl<P, E> {
    sessions: SessionManager<P>,
    submitter: Arc<Submitter<E>>,
    feed: ReceiptFeed<E>,
}

impl<P, E> Clone for RpcImpl<P, E> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            submitter: self.submitter.clone(),
            feed: self.feed.clone(),
        }
    }
}

/// Helper method that checks if the given API version is supported.
/// Returns an error if the API version is not supported.
fn parse_api_version(api_version: &str) -> Result<VaultRpcApiVersion, JsonRpcError> {
    VaultRpcApiVersion::from_str(api_version).map_err(|_| {
        VERSION_ERROR_COUNT.inc();
        jsonrpsee::types::ErrorObject::owned(
            JsonRpcErrorCode::InvalidVersion as i32,
            format!("Unsupported API version: \"{api_version}\"."),
            Some(vault_rpc_api_versions_info()),
        )
    })
}

/// Helper method that checks if the given API version has a deprecation warning.
/// Returns a warning if the API version is deprecated.
fn check_api_version_deprecation(api_version: &VaultRpcApiVersion) -> Option<JsonRpcWarning> {
    if VAULT_RPC_API_VERSIONS_DEPRECATED.contains(api_version) {
        DEPRECATION_WARNING_COUNT.inc();
        Some(JsonRpcWarning::new(
            JsonRpcWarningCode::DeprecatedVersion as i32,
            format!("The API version {api_version} will be deprecated."),
            Some(vault_rpc_api_versions_info()),
        ))
    } else {
        None
    }
}

/// Parses the version and collects its deprecation warning.
fn version_warnings(api_version: &str) -> Result<Vec<JsonRpcWarning>, JsonRpcError> {
    let api_version = parse_api_version(api_version)?;
    Ok(check_api_version_deprecation(&api_version)
        .into_iter()
        .collect())
}

/// Maps a vault error to a JSON-RPC error. Adapter failures get `adapter_code`.
fn vault_error(error: Error, adapter_code: JsonRpcErrorCode) -> JsonRpcError {
    let code = match &error {
        Error::WalletUnavailable | Error::NoAccounts | Error::NotConnected => {
            JsonRpcErrorCode::Wallet
        }
        Error::WrongNetwork { .. } => JsonRpcErrorCode::WrongNetwork,
        Error::InvalidBuyer { .. } | Error::Metadata(_) => JsonRpcErrorCode::InvalidReceipt,
        Error::ContractNotDeployed { .. } | Error::AdapterError { .. } => adapter_code,
    };
    jsonrpsee::types::ErrorObject::owned(code as i32, error.to_string(), None::<()>)
}

/// Warns about receipt sources that failed during the displayed refresh.
fn degraded_sources_warning(state: &FeedState) -> Option<JsonRpcWarning> {
    let sources = state.sources.as_ref()?;
    let failed: Vec<&str> = [
        ("explorer", &sources.explorer),
        ("contract", &sources.contract),
    ]
    .into_iter()
    .filter(|(_, outcome)| matches!(outcome, SourceOutcome::Error(_)))
    .map(|(name, _)| name)
    .collect();
    if failed.is_empty() {
        return None;
    }
    Some(JsonRpcWarning::new(
        JsonRpcWarningCode::DegradedSources as i32,
        format!("Some receipt sources failed: {}.", failed.join(", ")),
        Some(sources),
    ))
}

#[async_trait]
impl<P, E> RpcServer for RpcImpl<P, E>
where
    P: WalletProvider + Send + Sync + 'static,
    E: LocalStore + TransactionHistory + ContractReader + ReceiptSender + Send + Sync + 'static,
{
    fn api_versions(&self) -> JsonRpcResult<VaultRpcApiVersionsInfo> {
        Ok(JsonRpcResponse::ok(vault_rpc_api_versions_info()))
    }

    fn session_info(&self) -> JsonRpcResult<WalletSession> {
        Ok(JsonRpcResponse::ok(self.sessions.session()))
    }

    async fn connect_wallet(
        &self,
        api_version: String,
        chain_id: Option<u64>,
    ) -> JsonRpcResult<WalletSession> {
        let warnings = version_warnings(&api_version)?;
        let session = match chain_id {
            Some(chain_id) => self.sessions.connect_on(chain_id).await,
            None => self.sessions.connect().await,
        }
        .map_err(|e| vault_error(e, JsonRpcErrorCode::Wallet))?;
        Ok(JsonRpcResponse::warn(session, warnings))
    }

    fn disconnect_wallet(&self, api_version: String) -> JsonRpcResult<WalletSession> {
        let warnings = version_warnings(&api_version)?;
        self.sessions.disconnect();
        Ok(JsonRpcResponse::warn(self.sessions.session(), warnings))
    }

    fn receipts_list(
        &self,
        api_version: String,
        view: Option<ViewQuery>,
    ) -> JsonRpcResult<Vec<ReceiptRecord>> {
        let mut warnings = version_warnings(&api_version)?;
        let state = self.feed.state();
        warnings.extend(degraded_sources_warning(&state));
        let records = filter_and_sort(&state.records, &view.unwrap_or_default());
        Ok(JsonRpcResponse::warn(records, warnings))
    }

    async fn receipts_refresh(&self, api_version: String) -> JsonRpcResult<FeedState> {
        let mut warnings = version_warnings(&api_version)?;
        REFRESH_REQUEST_COUNTER.inc();
        self.feed.refresh(&self.sessions.session()).await;
        let state = self.feed.state();
        warnings.extend(degraded_sources_warning(&state));
        Ok(JsonRpcResponse::warn(state, warnings))
    }

    async fn receipts_issue(
        &self,
        api_version: String,
        request: IssueRequest,
        mode: Option<SubmissionMode>,
    ) -> JsonRpcResult<IssuedReceipt> {
        let mut warnings = version_warnings(&api_version)?;
        let session = self.sessions.session();
        match self
            .submitter
            .issue(&session, request, mode.unwrap_or_default())
            .await
        {
            Ok(issued) => {
                RECEIPTS_ISSUED_COUNTER.inc();
                if !issued.recorded_locally {
                    warnings.push(JsonRpcWarning::new(
                        JsonRpcWarningCode::NotRecordedLocally as i32,
                        format!(
                            "Receipt {} was issued but could not be recorded locally.",
                            issued.tx_hash
                        ),
                        None::<()>,
                    ));
                }
                Ok(JsonRpcResponse::warn(issued, warnings))
            }
            Err(e) => {
                ISSUANCE_FAILURE_COUNTER.inc();
                Err(vault_error(e, JsonRpcErrorCode::Submission))
            }
        }
    }

    async fn receipts_count(&self, api_version: String) -> JsonRpcResult<Option<u64>> {
        let warnings = version_warnings(&api_version)?;
        let count = self
            .feed
            .reconciler()
            .contract_receipt_count()
            .await
            .map_err(|e| vault_error(e, JsonRpcErrorCode::Reconciliation))?;
        Ok(JsonRpcResponse::warn(count, warnings))
    }

    fn explorer_url(&self, api_version: String, tx_hash: String) -> JsonRpcResult<String> {
        let warnings = version_warnings(&api_version)?;
        let url = network::transaction_url(self.sessions.session().chain_id, &tx_hash);
        Ok(JsonRpcResponse::warn(url, warnings))
    }
}

pub async fn run_server<P, E>(
    port: u16,
    sessions: SessionManager<P>,
    submitter: Arc<Submitter<E>>,
    feed: ReceiptFeed<E>,
    max_request_body_size: u32,
    max_response_body_size: u32,
    max_concurrent_connections: u32,
) -> Result<(JoinHandle<()>, SocketAddr)>
where
    P: WalletProvider + Send + Sync + 'static,
    E: LocalStore + TransactionHistory + ContractReader + ReceiptSender + Send + Sync + 'static,
{
    // Setting up the JSON RPC server
    let rpc_impl = RpcImpl {
        sessions,
        submitter,
        feed,
    };
    let (json_rpc_service, _) = create_json_rpc_service(
        rpc_impl,
        max_request_body_size,
        max_response_body_size,
        max_concurrent_connections,
    )?;

    async fn handle_anyhow_error(err: BoxError) -> (StatusCode, String) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Something went wrong: {err}"),
        )
    }
    let json_rpc_router = Router::new().route_service(
        "/",
        HandleError::new(post_service(json_rpc_service), handle_anyhow_error),
    );

    let listener = TcpListener::bind(&format!("0.0.0.0:{port}")).await?;

    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, json_rpc_router)
            .with_graceful_shutdown(shutdown_handler())
            .await
        {
            error!("Receipt vault server error: {e}");
        }
    });

    Ok((handle, addr))
}

/// Graceful shutdown handler
async fn shutdown_handler() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, starting graceful shutdown");
}

fn create_json_rpc_service<P, E>(
    rpc_impl: RpcImpl<P, E>,
    max_request_body_size: u32,
    max_response_body_size: u32,
    max_concurrent_connections: u32,
) -> Result<(TowerService<Identity, Identity>, ServerHandle)>
where
    P: WalletProvider + Send + Sync + 'static,
    E: LocalStore + TransactionHistory + ContractReader + ReceiptSender + Send + Sync + 'static,
{
    let config = ServerConfig::builder()
        .max_request_body_size(max_request_body_size)
        .max_response_body_size(max_response_body_size)
        .max_connections(max_concurrent_connections)
        .http_only()
        .build();

    let service_builder = ServerBuilder::new().set_config(config).to_service_builder();
    let (stop_handle, server_handle) = stop_channel();
    let handle = service_builder.build(rpc_impl.into_rpc(), stop_handle);
    Ok((handle, server_handle))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy::primitives::{address, Address, B256};
    use jsonrpsee::{core::client::ClientT, http_client::HttpClientBuilder, rpc_params};
    use rstest::*;
    use vault_core::{
        directory::RetailerDirectory,
        feed::{FeedState, ReceiptFeed},
        issuance::{IssueRequest, IssuedReceipt, SubmissionMode, Submitter, SubmitterConfig},
        manager::{
            context::memory::{Component, InMemoryContext},
            Reconciler,
        },
        network::{self, MAINNET_CHAIN_ID, SEPOLIA_CHAIN_ID},
        receipt::ReceiptRecord,
        session::{SessionManager, WalletSession},
        view::ViewQuery,
    };

    use crate::{
        error_codes::{JsonRpcErrorCode, JsonRpcWarningCode},
        server,
    };

    const CITY_DINER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
    const CUSTOMER: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

    #[fixture]
    fn context() -> InMemoryContext {
        InMemoryContext::new().with_accounts(vec![CITY_DINER])
    }

    #[fixture]
    fn http_request_size_limit() -> u32 {
        100 * 1024
    }

    #[fixture]
    fn http_response_size_limit() -> u32 {
        100 * 1024
    }

    #[fixture]
    fn http_max_concurrent_connections() -> u32 {
        1
    }

    async fn start(
        context: InMemoryContext,
        max_request_body_size: u32,
        max_response_body_size: u32,
        max_concurrent_connections: u32,
    ) -> (tokio::task::JoinHandle<()>, impl ClientT) {
        let sessions = SessionManager::new(Some(context.clone()));
        let submitter = Arc::new(Submitter::new(context.clone(), SubmitterConfig::default()));
        let feed = ReceiptFeed::new(Reconciler::new(context, RetailerDirectory::default()));

        // Start the JSON-RPC server.
        let (handle, local_addr) = server::run_server(
            0,
            sessions,
            submitter,
            feed,
            max_request_body_size,
            max_response_body_size,
            max_concurrent_connections,
        )
        .await
        .unwrap();

        // Start the JSON-RPC client.
        let client = HttpClientBuilder::default()
            .build(format!("http://127.0.0.1:{}", local_addr.port()))
            .unwrap();
        (handle, client)
    }

    fn error_code<T: std::fmt::Debug>(res: Result<T, jsonrpsee::core::ClientError>) -> i32 {
        match res.expect_err("Expected an error") {
            jsonrpsee::core::ClientError::Call(err) => err.code(),
            other => panic!("Expected a call error, got {other:?}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn protocol_version(
        context: InMemoryContext,
        http_request_size_limit: u32,
        http_response_size_limit: u32,
        http_max_concurrent_connections: u32,
    ) {
        let (handle, client) = start(
            context,
            http_request_size_limit,
            http_response_size_limit,
            http_max_concurrent_connections,
        )
        .await;

        let res: server::JsonRpcResponse<server::VaultRpcApiVersionsInfo> = client
            .request("api_versions", rpc_params!(None::<()>))
            .await
            .unwrap();
        assert!(res
            .data
            .versions_supported
            .contains(&server::VaultRpcApiVersion::V0_0));

        handle.abort();
    }

    #[rstest]
    #[tokio::test]
    async fn issued_receipt_is_listed(
        context: InMemoryContext,
        http_request_size_limit: u32,
        http_response_size_limit: u32,
        http_max_concurrent_connections: u32,
        #[values(SubmissionMode::RawTransaction, SubmissionMode::ContractCall)]
        mode: SubmissionMode,
    ) {
        let (handle, client) = start(
            context.clone(),
            http_request_size_limit,
            http_response_size_limit,
            http_max_concurrent_connections,
        )
        .await;

        let session: server::JsonRpcResponse<WalletSession> = client
            .request("connect_wallet", rpc_params!("0.0", None::<u64>))
            .await
            .unwrap();
        assert_eq!(session.data.active_account(), Some(CITY_DINER));

        let request = IssueRequest {
            amount: Some("12.50".to_string()),
            category: Some("food".to_string()),
            items: Some("soup, bread".to_string()),
            ..IssueRequest::new(CUSTOMER)
        };
        let issued: server::JsonRpcResponse<IssuedReceipt> = client
            .request("receipts_issue", rpc_params!("0.0", &request, Some(mode)))
            .await
            .unwrap();
        assert!(issued.data.recorded_locally);
        assert!(issued.warnings.is_none());
        assert_eq!(context.sent_transactions().len(), 1);

        let state: server::JsonRpcResponse<FeedState> = client
            .request("receipts_refresh", rpc_params!("0.0"))
            .await
            .unwrap();
        assert_eq!(state.data.records.len(), 1);

        let view = ViewQuery {
            query: "city".to_string(),
            ..Default::default()
        };
        let listed: server::JsonRpcResponse<Vec<ReceiptRecord>> = client
            .request("receipts_list", rpc_params!("0.0", Some(view)))
            .await
            .unwrap();
        assert_eq!(listed.data.len(), 1);
        assert_eq!(listed.data[0].retailer_name, "City Diner");
        assert_eq!(listed.data[0].amount, "12.50");
        assert_eq!(
            listed.data[0].transaction_hash,
            issued.data.tx_hash.to_string()
        );

        handle.abort();
    }

    #[rstest]
    #[tokio::test]
    async fn issuing_requires_a_connected_wallet(
        context: InMemoryContext,
        http_request_size_limit: u32,
        http_response_size_limit: u32,
        http_max_concurrent_connections: u32,
    ) {
        let (handle, client) = start(
            context.clone(),
            http_request_size_limit,
            http_response_size_limit,
            http_max_concurrent_connections,
        )
        .await;

        let res: Result<server::JsonRpcResponse<IssuedReceipt>, _> = client
            .request(
                "receipts_issue",
                rpc_params!("0.0", IssueRequest::new(CUSTOMER), None::<SubmissionMode>),
            )
            .await;
        assert_eq!(error_code(res), JsonRpcErrorCode::Wallet as i32);
        assert!(context.sent_transactions().is_empty());

        handle.abort();
    }

    #[rstest]
    #[tokio::test]
    async fn raw_receipts_need_the_target_network(
        http_request_size_limit: u32,
        http_response_size_limit: u32,
        http_max_concurrent_connections: u32,
    ) {
        let context = InMemoryContext::new()
            .with_accounts(vec![CITY_DINER])
            .with_chain_id(MAINNET_CHAIN_ID);
        let (handle, client) = start(
            context.clone(),
            http_request_size_limit,
            http_response_size_limit,
            http_max_concurrent_connections,
        )
        .await;

        let _: server::JsonRpcResponse<WalletSession> = client
            .request("connect_wallet", rpc_params!("0.0", None::<u64>))
            .await
            .unwrap();
        let res: Result<server::JsonRpcResponse<IssuedReceipt>, _> = client
            .request(
                "receipts_issue",
                rpc_params!(
                    "0.0",
                    IssueRequest::new(CUSTOMER),
                    Some(SubmissionMode::RawTransaction)
                ),
            )
            .await;
        assert_eq!(error_code(res), JsonRpcErrorCode::WrongNetwork as i32);

        handle.abort();
    }

    #[rstest]
    #[tokio::test]
    async fn explorer_url_follows_session_network(
        context: InMemoryContext,
        http_request_size_limit: u32,
        http_response_size_limit: u32,
        http_max_concurrent_connections: u32,
    ) {
        let (handle, client) = start(
            context,
            http_request_size_limit,
            http_response_size_limit,
            http_max_concurrent_connections,
        )
        .await;
        let _: server::JsonRpcResponse<WalletSession> = client
            .request("connect_wallet", rpc_params!("0.0", Some(SEPOLIA_CHAIN_ID)))
            .await
            .unwrap();

        let tx_hash = B256::repeat_byte(0xab).to_string();
        let url: server::JsonRpcResponse<String> = client
            .request("explorer_url", rpc_params!("0.0", &tx_hash))
            .await
            .unwrap();
        assert_eq!(
            url.data,
            format!(
                "{}/tx/{tx_hash}",
                network::explorer_base_url(Some(SEPOLIA_CHAIN_ID))
            )
        );

        handle.abort();
    }

    #[rstest]
    #[tokio::test]
    async fn invalid_api_version(
        context: InMemoryContext,
        http_request_size_limit: u32,
        http_response_size_limit: u32,
        http_max_concurrent_connections: u32,
    ) {
        let (handle, client) = start(
            context,
            http_request_size_limit,
            http_response_size_limit,
            http_max_concurrent_connections,
        )
        .await;

        let res: Result<server::JsonRpcResponse<Vec<ReceiptRecord>>, jsonrpsee::core::ClientError> =
            client
                .request(
                    "receipts_list",
                    rpc_params!("invalid version string", None::<ViewQuery>),
                )
                .await;

        // Make sure the JSON-RPC error is "invalid version"
        assert!(res
            .as_ref()
            .unwrap_err()
            .to_string()
            .contains("Unsupported API version"));

        // Check the API versions returned by the server
        match res.expect_err("Expected an error") {
            jsonrpsee::core::ClientError::Call(err) => {
                assert_eq!(err.code(), JsonRpcErrorCode::InvalidVersion as i32);
                let versions: server::VaultRpcApiVersionsInfo =
                    serde_json::from_str(err.data().unwrap().get()).unwrap();
                assert!(versions
                    .versions_supported
                    .contains(&server::VaultRpcApiVersion::V0_0));
            }
            _ => panic!("Expected data in error"),
        }

        handle.abort();
    }

    #[rstest]
    #[tokio::test]
    async fn contract_count_without_deployment_is_null(
        http_request_size_limit: u32,
        http_response_size_limit: u32,
        http_max_concurrent_connections: u32,
    ) {
        let context = InMemoryContext::new().with_accounts(vec![CITY_DINER]);
        context.set_contract_receipts(None);
        let (handle, client) = start(
            context,
            http_request_size_limit,
            http_response_size_limit,
            http_max_concurrent_connections,
        )
        .await;

        let count: server::JsonRpcResponse<Option<u64>> = client
            .request("receipts_count", rpc_params!("0.0"))
            .await
            .unwrap();
        assert_eq!(count.data, None);

        handle.abort();
    }

    #[rstest]
    #[tokio::test]
    async fn failing_history_is_a_warning(
        context: InMemoryContext,
        http_request_size_limit: u32,
        http_response_size_limit: u32,
        http_max_concurrent_connections: u32,
    ) {
        let (handle, client) = start(
            context.clone(),
            http_request_size_limit,
            http_response_size_limit,
            http_max_concurrent_connections,
        )
        .await;
        let _: server::JsonRpcResponse<WalletSession> = client
            .request("connect_wallet", rpc_params!("0.0", None::<u64>))
            .await
            .unwrap();
        context.fail(Component::History);

        let state: server::JsonRpcResponse<FeedState> = client
            .request("receipts_refresh", rpc_params!("0.0"))
            .await
            .unwrap();
        let warnings = state.warnings.expect("Expected a warning");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, JsonRpcWarningCode::DegradedSources as i32);
        assert!(warnings[0].message.contains("explorer"));

        handle.abort();
    }
}
