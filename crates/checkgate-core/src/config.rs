//! Gate configuration
//!
//! All identity the gate needs is injected here at construction time: the
//! GitHub App id that owns our check runs, the bot account whose own pull
//! requests auto-pass, the check run name, and the QE reviewer logins.

/// Name given to check runs created by the gate
pub const DEFAULT_CHECK_NAME: &str = "Kiali - PR";

/// Configuration for the QE check gate
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// GitHub App id owning the gate's check runs
    pub app_id: u64,
    /// Login of the bot account; its own pull requests always pass
    pub bot_login: String,
    /// Name given to created check runs
    pub check_name: String,
    /// Reviewer logins authorized to approve on behalf of the QE gate
    pub qe_users: Vec<String>,
}

impl GateConfig {
    pub fn new(app_id: u64, bot_login: impl Into<String>, qe_users: Vec<String>) -> Self {
        Self {
            app_id,
            bot_login: bot_login.into(),
            check_name: DEFAULT_CHECK_NAME.to_string(),
            qe_users,
        }
    }

    /// Override the check run name
    pub fn with_check_name(mut self, name: impl Into<String>) -> Self {
        self.check_name = name.into();
        self
    }

    /// Whether a login belongs to the QE approver set
    pub fn is_qe_user(&self, login: &str) -> bool {
        self.qe_users.iter().any(|u| u == login)
    }

    /// Whether a check run belongs to this gate.
    ///
    /// Either signal suffices: the app id matching ours, or the check run
    /// name matching ours. The OR is permissive (a foreign check run with a
    /// colliding name is treated as owned) and is kept as-is until product
    /// intent says otherwise.
    pub fn owns_check_run(&self, app_id: Option<u64>, name: &str) -> bool {
        app_id == Some(self.app_id) || name == self.check_name
    }
}
