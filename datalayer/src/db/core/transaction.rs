//! Transaction management module
//!
//! A transaction handle wraps one transport-level transaction on the shared
//! connection. States: `Active` → `Committed` | `RolledBack`, and `Disposed` from any
//! state. Commit/rollback outside `Active` fail with `InvalidState`.

use crate::db::core::connection::ConnectionHandle;
use crate::db::core::types::TransactionId;
use crate::error::{DalError, DalResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 트랜잭션 공유 핸들
pub type TransactionHandle = Arc<Transaction>;

/// 트랜잭션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
    Disposed,
}

impl TransactionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::Active => "active",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled back",
            TransactionState::Disposed => "disposed",
        }
    }
}

/// 트랜잭션 핸들
pub struct Transaction {
    id: TransactionId,
    connection: ConnectionHandle,
    state: Mutex<TransactionState>,
}

impl Transaction {
    /// 연결 위에서 새 트랜잭션 시작
    pub(crate) fn begin(connection: &ConnectionHandle) -> DalResult<TransactionHandle> {
        let id = connection.with_transport("begin a transaction", |transport| transport.begin())?;

        debug!(connection = connection.id(), transaction = id, "Transaction started");

        Ok(Arc::new(Self {
            id,
            connection: Arc::clone(connection),
            state: Mutex::new(TransactionState::Active),
        }))
    }

    /// Transport-level identifier, read by commands enlisting in this transaction.
    pub fn underlying_handle(&self) -> TransactionId {
        self.id
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    pub fn commit(&self) -> DalResult<()> {
        let mut state = self.state.lock();
        self.ensure_active(*state, "commit")?;

        self.connection
            .with_transport("commit", |transport| transport.commit(self.id))?;
        *state = TransactionState::Committed;

        info!(transaction = self.id, "Transaction committed successfully");
        Ok(())
    }

    pub fn rollback(&self) -> DalResult<()> {
        let mut state = self.state.lock();
        self.ensure_active(*state, "roll back")?;

        self.connection
            .with_transport("roll back", |transport| transport.rollback(self.id))?;
        *state = TransactionState::RolledBack;

        warn!(transaction = self.id, "Transaction rolled back");
        Ok(())
    }

    /// 리소스 해제 - 어떤 상태에서도 호출 가능하며 두 번째 호출은 아무것도 하지 않습니다.
    ///
    /// An `Active` transaction is rolled back first. The handle ends `Disposed` even
    /// when that rollback fails; the failure is returned.
    pub fn dispose(&self) -> DalResult<()> {
        let mut state = self.state.lock();
        let previous = *state;
        *state = TransactionState::Disposed;

        match previous {
            TransactionState::Disposed => Ok(()),
            TransactionState::Active if self.connection.is_open() => {
                debug!(transaction = self.id, "Disposing active transaction, rolling back");
                self.connection
                    .with_transport("roll back", |transport| transport.rollback(self.id))
            }
            _ => {
                debug!(transaction = self.id, from = previous.as_str(), "Transaction disposed");
                Ok(())
            }
        }
    }

    /// Runs `operation` while holding the state lock, provided the transaction is
    /// still `Active`.
    pub(crate) fn with_active<R>(
        &self,
        action: &str,
        operation: impl FnOnce(TransactionId) -> DalResult<R>,
    ) -> DalResult<R> {
        let state = self.state.lock();
        self.ensure_active(*state, action)?;
        operation(self.id)
    }

    fn ensure_active(&self, state: TransactionState, action: &str) -> DalResult<()> {
        if state == TransactionState::Active {
            Ok(())
        } else {
            Err(DalError::InvalidState(format!(
                "cannot {} transaction {}: it is {}",
                action,
                self.id,
                state.as_str()
            )))
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("connection", &self.connection.id())
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if *self.state.get_mut() == TransactionState::Active {
            if let Err(e) = self.dispose() {
                warn!(transaction = self.id, error = %e, "Rollback on drop failed");
            }
        }
    }
}
