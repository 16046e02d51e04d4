//! Payment submission workflow
//!
//! ```text
//!            submit()                 group accepted
//!   Idle ───────────────► Submitting ───────────────► Completed (terminal)
//!    ▲                        │
//!    │                        │ any error
//!    │      submit()          ▼
//!    └─────────────────── Failed ──────► Submitting
//! ```
//!
//! A submission abandoned after its group was handed to the node ends in
//! `Unconfirmed` instead: the payment may still land, so nothing more is
//! sent until `reset()`.
//!
//! One submission builds one [`PaymentIntent`] from current inputs, fetches
//! fresh network parameters, signs a two-transaction group (payment then
//! contract call) and broadcasts it. Nothing is retried automatically and
//! nothing from a failed attempt is reused by the next one.

use super::editor::AmountEditor;
use super::units::{UnitError, UnitScale};
use super::{PaymentError, SubmissionResult};
use crate::chain::{
    assign_group_id, method_selector, parse_application_id, Address, ChainClient,
    SignedTransaction, Transaction,
};
use crate::config::PaymentConfig;
use crate::machines::{LookupError, MachineDirectory};
use crate::models::MachineRecord;
use crate::wallet::{TransactionSigner, WalletProvider};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub scale: UnitScale,
    pub method_signature: String,
    pub max_amount: String,
    /// Bound on each network or signing step
    pub timeout: Duration,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        let config = PaymentConfig::default();
        Self {
            scale: UnitScale::default(),
            method_signature: config.method_signature,
            max_amount: config.max_amount,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl PaymentSettings {
    pub fn from_config(config: &PaymentConfig) -> Result<Self, UnitError> {
        Ok(Self {
            scale: UnitScale::new(config.unit_decimals)?,
            method_signature: config.method_signature.clone(),
            max_amount: config.max_amount.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

/// Everything needed to build and sign one payment group. Used once.
pub struct PaymentIntent {
    pub sender: Address,
    pub receiver: Address,
    pub app_id: u64,
    pub amount: u64,
    signer: Arc<dyn TransactionSigner>,
}

impl std::fmt::Debug for PaymentIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentIntent")
            .field("sender", &self.sender)
            .field("receiver", &self.receiver)
            .field("app_id", &self.app_id)
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}

/// Stateless submission logic shared by every checkout
pub struct PaymentWorkflow {
    chain: Arc<dyn ChainClient>,
    settings: PaymentSettings,
    selector: [u8; 4],
}

impl PaymentWorkflow {
    pub fn new(chain: Arc<dyn ChainClient>, settings: PaymentSettings) -> Self {
        let selector = method_selector(&settings.method_signature);
        Self {
            chain,
            settings,
            selector,
        }
    }

    pub fn settings(&self) -> &PaymentSettings {
        &self.settings
    }

    /// Validate inputs and resolve everything that needs no network.
    ///
    /// `entered` is the keypad value; for fixed-price machines it only has to
    /// be valid, the machine's price is what gets charged.
    pub fn prepare_intent(
        &self,
        entered: Decimal,
        machine: Option<&MachineRecord>,
        wallet: &dyn WalletProvider,
    ) -> Result<PaymentIntent, PaymentError> {
        if entered <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(format!(
                "{} must be greater than zero",
                entered
            )));
        }

        let signer = match (wallet.active_address(), wallet.signer()) {
            (Some(_), Some(signer)) => signer,
            _ => return Err(PaymentError::NotReady("connect a wallet to pay".to_string())),
        };
        let machine = machine
            .ok_or_else(|| PaymentError::NotReady("machine details are not loaded".to_string()))?;

        let settlement = if machine.fixed_price {
            if entered != machine.price {
                debug!(
                    "Machine {} has a fixed price of {}; ignoring entered amount {}",
                    machine.id, machine.price, entered
                );
            }
            machine.price
        } else {
            entered
        };

        let amount = self.settings.scale.to_smallest_unit(settlement)?;
        let app_id = parse_application_id(&machine.contract_address)?;

        Ok(PaymentIntent {
            sender: signer.address(),
            receiver: Address::for_application(app_id),
            app_id,
            amount,
            signer,
        })
    }

    /// Fetch fresh parameters, build the payment + contract call group and
    /// have the intent's signer sign it. Nothing leaves the process.
    pub async fn sign_group(
        &self,
        intent: PaymentIntent,
    ) -> Result<Vec<SignedTransaction>, PaymentError> {
        debug!("Signing {:?}", intent);

        let params = self
            .bounded("fetching network parameters", self.chain.suggested_params())
            .await?;

        let mut group = vec![
            Transaction::payment(intent.sender, intent.receiver, intent.amount, &params),
            Transaction::app_call(
                intent.sender,
                intent.app_id,
                vec![self.selector.to_vec()],
                &params,
            ),
        ];
        assign_group_id(&mut group)?;

        let signed = self
            .bounded("waiting for the wallet signature", intent.signer.sign_transactions(&group))
            .await?;
        if signed.len() != group.len() {
            return Err(PaymentError::NotReady(format!(
                "wallet signed {} of {} transactions",
                signed.len(),
                group.len()
            )));
        }
        Ok(signed)
    }

    /// Hand a signed group to the node. Returns the member ids in order.
    pub async fn broadcast(&self, signed: &[SignedTransaction]) -> Result<Vec<String>, PaymentError> {
        let ids = self
            .bounded("submitting the payment", self.chain.submit(signed))
            .await?;
        if ids.len() != signed.len() {
            return Err(PaymentError::Network(format!(
                "node returned {} transaction ids for a group of {}",
                ids.len(),
                signed.len()
            )));
        }
        Ok(ids)
    }

    async fn bounded<T, E>(
        &self,
        step: &str,
        future: impl Future<Output = Result<T, E>>,
    ) -> Result<T, PaymentError>
    where
        PaymentError: From<E>,
    {
        match tokio::time::timeout(self.settings.timeout, future).await {
            Ok(result) => result.map_err(PaymentError::from),
            Err(_) => Err(PaymentError::Network(format!(
                "timed out after {}s while {}",
                self.settings.timeout.as_secs_f64(),
                step
            ))),
        }
    }
}

/// Checkout state as seen by the page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutPhase {
    #[default]
    Idle,
    Submitting,
    Completed {
        tx_id: String,
    },
    Failed {
        kind: super::ErrorKind,
        message: String,
    },
    /// Abandoned after the group reached the node; the outcome is unknown
    Unconfirmed {
        message: String,
    },
}

impl CheckoutPhase {
    /// Whether a submit from this phase starts a new payment
    pub fn accepts_submit(&self) -> bool {
        matches!(self, CheckoutPhase::Idle | CheckoutPhase::Failed { .. })
    }
}

const UNCONFIRMED_MESSAGE: &str =
    "payment was sent but its outcome is unknown; check the chain before paying again";

struct CheckoutState {
    editor: AmountEditor,
    phase: CheckoutPhase,
    /// Set once the signed group is handed to the node
    dispatched: bool,
}

fn lock(state: &Mutex<CheckoutState>) -> MutexGuard<'_, CheckoutState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// Settles the phase if the submit future is dropped before finishing: back to
// Idle before dispatch, Unconfirmed after
struct SubmittingGuard<'a> {
    state: &'a Mutex<CheckoutState>,
    finished: bool,
}

impl SubmittingGuard<'_> {
    fn finish(mut self, phase: CheckoutPhase, freeze: bool) {
        let mut state = lock(self.state);
        state.phase = phase;
        state.dispatched = false;
        if freeze {
            state.editor.freeze();
        }
        self.finished = true;
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = lock(self.state);
        if state.phase != CheckoutPhase::Submitting {
            return;
        }
        if state.dispatched {
            error!("Payment submission abandoned after dispatch; outcome unknown");
            state.phase = CheckoutPhase::Unconfirmed {
                message: UNCONFIRMED_MESSAGE.to_string(),
            };
        } else {
            warn!("Payment submission abandoned before dispatch");
            state.phase = CheckoutPhase::Idle;
        }
    }
}

/// One machine's payment page: the loaded record, the keypad and the phase.
///
/// Safe to share between tasks; at most one submission is in flight.
pub struct Checkout {
    workflow: Arc<PaymentWorkflow>,
    wallet: Arc<dyn WalletProvider>,
    machine: Option<MachineRecord>,
    state: Mutex<CheckoutState>,
}

impl Checkout {
    pub fn new(
        workflow: Arc<PaymentWorkflow>,
        wallet: Arc<dyn WalletProvider>,
        machine: Option<MachineRecord>,
    ) -> Self {
        let editor = Self::fresh_editor(&workflow.settings, machine.as_ref());
        Self {
            workflow,
            wallet,
            machine,
            state: Mutex::new(CheckoutState {
                editor,
                phase: CheckoutPhase::Idle,
                dispatched: false,
            }),
        }
    }

    /// Look the machine up once and open a checkout for it
    pub async fn load(
        workflow: Arc<PaymentWorkflow>,
        wallet: Arc<dyn WalletProvider>,
        directory: &dyn MachineDirectory,
        machine_id: &str,
    ) -> Result<Self, LookupError> {
        let machine = directory.fetch_machine(machine_id).await.map_err(|e| {
            error!("Error fetching machine {}: {}", machine_id, e);
            e
        })?;
        info!(
            "Loaded machine {} (contract {}, price {})",
            machine.id, machine.contract_address, machine.price
        );
        Ok(Self::new(workflow, wallet, Some(machine)))
    }

    fn fresh_editor(settings: &PaymentSettings, machine: Option<&MachineRecord>) -> AmountEditor {
        match machine {
            Some(m) => AmountEditor::seeded(m.price.normalize().to_string(), &settings.max_amount),
            None => AmountEditor::new(&settings.max_amount),
        }
    }

    pub fn machine(&self) -> Option<&MachineRecord> {
        self.machine.as_ref()
    }

    pub fn phase(&self) -> CheckoutPhase {
        lock(&self.state).phase.clone()
    }

    pub fn amount_text(&self) -> String {
        lock(&self.state).editor.as_str().to_string()
    }

    /// Apply keypad edits. Ignored by the editor once the payment completed.
    pub fn edit<R>(&self, f: impl FnOnce(&mut AmountEditor) -> R) -> R {
        f(&mut lock(&self.state).editor)
    }

    /// Start over: fresh keypad seeded from the machine, phase back to Idle
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        if state.phase == CheckoutPhase::Submitting {
            warn!("Ignoring reset while a payment is in flight");
            return;
        }
        state.editor = Self::fresh_editor(&self.workflow.settings, self.machine.as_ref());
        state.phase = CheckoutPhase::Idle;
        state.dispatched = false;
    }

    /// Run one submission. A second call while one is in flight, after
    /// completion, or after an unconfirmed dispatch is refused without
    /// touching the network.
    pub async fn submit(&self) -> SubmissionResult {
        let entered = {
            let mut state = lock(&self.state);
            match &state.phase {
                CheckoutPhase::Submitting => {
                    return SubmissionResult::failure(&PaymentError::NotReady(
                        "a payment is already being submitted".to_string(),
                    ));
                }
                CheckoutPhase::Completed { .. } => {
                    return SubmissionResult::failure(&PaymentError::NotReady(
                        "payment already completed".to_string(),
                    ));
                }
                CheckoutPhase::Unconfirmed { message } => {
                    return SubmissionResult::failure(&PaymentError::NotReady(message.clone()));
                }
                CheckoutPhase::Idle | CheckoutPhase::Failed { .. } => {}
            }
            state.phase = CheckoutPhase::Submitting;
            state.editor.amount()
        };
        let guard = SubmittingGuard {
            state: &self.state,
            finished: false,
        };

        match self.run(entered.map_err(PaymentError::from)).await {
            Ok((tx_id, group)) => {
                info!("Payment completed: {}", tx_id);
                guard.finish(
                    CheckoutPhase::Completed {
                        tx_id: tx_id.clone(),
                    },
                    true,
                );
                SubmissionResult::Success { tx_id, group }
            }
            Err(e) => {
                warn!("Payment failed ({}): {}", e.kind(), e);
                let result = SubmissionResult::failure(&e);
                guard.finish(
                    CheckoutPhase::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    },
                    false,
                );
                result
            }
        }
    }

    async fn run(
        &self,
        entered: Result<Decimal, PaymentError>,
    ) -> Result<(String, Vec<String>), PaymentError> {
        let intent =
            self.workflow
                .prepare_intent(entered?, self.machine.as_ref(), self.wallet.as_ref())?;
        info!(
            "Paying {} smallest units to application {} ({})",
            intent.amount, intent.app_id, intent.receiver
        );
        let signed = self.workflow.sign_group(intent).await?;

        lock(&self.state).dispatched = true;
        let group = self.workflow.broadcast(&signed).await?;

        // The contract call is the last member of the group
        let tx_id = group
            .last()
            .cloned()
            .ok_or_else(|| PaymentError::Network("node returned no transaction ids".to_string()))?;
        Ok((tx_id, group))
    }
}
