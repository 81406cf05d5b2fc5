//! PIN-based login for the two roles.
//!
//! The sheet's `Settings` tab is the source of truth for both PINs. Locally
//! only bcrypt hashes are kept (category "staff", keys "admin_pin_hash" /
//! "cashier_pin_hash"); until a PIN has been stored the defaults apply.
//! Failed attempts are counted in the same table so a lockout survives a
//! restart.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::db::{self, DbState, CATEGORY_STAFF};
use crate::error::{PosError, PosResult};
use crate::models::{Role, SettingKey};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAX_FAILED_ATTEMPTS: u32 = 5;
const LOCKOUT_MINUTES: i64 = 15;
const LOCKOUT_ATTEMPTS_KEY: &str = "lockout_attempts";
const LOCKOUT_LAST_ATTEMPT_KEY: &str = "lockout_last_attempt";
pub const MIN_PIN_LEN: usize = 4;

const PIN_HASH_COST: u32 = if cfg!(test) { 4 } else { bcrypt::DEFAULT_COST };

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Session {
    session_id: String,
    role: Role,
    login_time: DateTime<Utc>,
}

struct LockoutEntry {
    attempts: u32,
    last_attempt: DateTime<Utc>,
}

/// In-memory login state.
pub struct AuthState {
    session: Mutex<Option<Session>>,
    lockout: Mutex<LockoutEntry>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthState {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
            lockout: Mutex::new(LockoutEntry {
                attempts: 0,
                last_attempt: Utc::now(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// PIN storage
// ---------------------------------------------------------------------------

fn pin_hash_key(key: SettingKey) -> &'static str {
    match key {
        SettingKey::AdminPin => "admin_pin_hash",
        SettingKey::CashierPin => "cashier_pin_hash",
    }
}

/// Hash and store a PIN. A PIN that already matches the stored hash is left
/// alone, so refreshing settings from the sheet does not rehash every time.
pub fn store_pin(db: &DbState, key: SettingKey, pin: &str) -> PosResult<()> {
    let pin = Zeroizing::new(pin.trim().to_string());
    if pin.is_empty() {
        return Err(PosError::validation("PIN is required"));
    }

    if let Some(existing) = db::read_setting(db, CATEGORY_STAFF, pin_hash_key(key))? {
        if bcrypt::verify(pin.as_str(), &existing).unwrap_or(false) {
            return Ok(());
        }
    }

    let hash = bcrypt::hash(pin.as_str(), PIN_HASH_COST)
        .map_err(|e| PosError::Storage(format!("Failed to hash {}: {e}", key.as_str())))?;
    db::write_setting(db, CATEGORY_STAFF, pin_hash_key(key), &hash)?;
    info!(key = key.as_str(), "PIN hash stored");
    Ok(())
}

/// Check a PIN against the stored hash, or the default when none is stored.
pub fn verify_pin(db: &DbState, key: SettingKey, pin: &str) -> PosResult<bool> {
    match db::read_setting(db, CATEGORY_STAFF, pin_hash_key(key))? {
        Some(hash) => Ok(bcrypt::verify(pin, &hash).unwrap_or(false)),
        None => Ok(pin == key.default_pin()),
    }
}

/// Validate a new PIN and its confirmation.
pub fn validate_new_pin(pin: &str, confirmation: &str) -> PosResult<()> {
    if pin.chars().count() < MIN_PIN_LEN {
        return Err(PosError::validation(format!(
            "PIN must be at least {MIN_PIN_LEN} digits"
        )));
    }
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(PosError::validation("PIN must contain only digits"));
    }
    if pin != confirmation {
        return Err(PosError::validation("PIN confirmation does not match"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Lockout
// ---------------------------------------------------------------------------

fn check_lockout(lockout: &LockoutEntry) -> PosResult<()> {
    if lockout.attempts >= MAX_FAILED_ATTEMPTS {
        let elapsed = Utc::now() - lockout.last_attempt;
        if elapsed < Duration::minutes(LOCKOUT_MINUTES) {
            let remaining = LOCKOUT_MINUTES - elapsed.num_minutes();
            return Err(PosError::Auth(format!(
                "Too many failed attempts. Try again in {remaining} minute(s)."
            )));
        }
    }
    Ok(())
}

fn record_failure(lockout: &mut LockoutEntry) {
    lockout.attempts += 1;
    lockout.last_attempt = Utc::now();
    warn!(attempts = lockout.attempts, "failed login attempt");
}

fn reset_lockout(lockout: &mut LockoutEntry) {
    lockout.attempts = 0;
    lockout.last_attempt = Utc::now();
}

fn load_lockout(db: &DbState) -> PosResult<LockoutEntry> {
    let attempts = db::read_setting(db, CATEGORY_STAFF, LOCKOUT_ATTEMPTS_KEY)?
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    let last_attempt = db::read_setting(db, CATEGORY_STAFF, LOCKOUT_LAST_ATTEMPT_KEY)?
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    Ok(LockoutEntry {
        attempts,
        last_attempt,
    })
}

fn persist_lockout(db: &DbState, lockout: &LockoutEntry) -> PosResult<()> {
    db::write_setting(
        db,
        CATEGORY_STAFF,
        LOCKOUT_ATTEMPTS_KEY,
        &lockout.attempts.to_string(),
    )?;
    db::write_setting(
        db,
        CATEGORY_STAFF,
        LOCKOUT_LAST_ATTEMPT_KEY,
        &lockout.last_attempt.to_rfc3339(),
    )
}

/// The in-memory counter still applies when the write fails.
fn persist_lockout_or_warn(db: &DbState, lockout: &LockoutEntry) {
    if let Err(e) = persist_lockout(db, lockout) {
        warn!(attempts = lockout.attempts, error = %e, "failed to persist login lockout");
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> PosError {
    PosError::Storage(format!("auth state lock poisoned: {e}"))
}

// ---------------------------------------------------------------------------
// Login / logout
// ---------------------------------------------------------------------------

/// Verify a PIN (admin first, then cashier) and open a session.
pub fn login(
    db: &DbState,
    auth: &AuthState,
    pin: impl Into<Zeroizing<String>>,
) -> PosResult<Role> {
    let pin: Zeroizing<String> = pin.into();
    let pin = pin.trim();
    if pin.is_empty() {
        return Err(PosError::Auth("PIN is required".into()));
    }

    let persisted = load_lockout(db)?;
    {
        let mut lockout = auth.lockout.lock().map_err(lock_err)?;
        *lockout = persisted;
        check_lockout(&lockout)?;
    }

    for (key, role) in [
        (SettingKey::AdminPin, Role::Admin),
        (SettingKey::CashierPin, Role::Cashier),
    ] {
        if verify_pin(db, key, pin)? {
            let mut lockout = auth.lockout.lock().map_err(lock_err)?;
            reset_lockout(&mut lockout);
            persist_lockout_or_warn(db, &lockout);
            drop(lockout);

            let session = Session {
                session_id: Uuid::new_v4().to_string(),
                role,
                login_time: Utc::now(),
            };
            info!(role = role.as_str(), session_id = %session.session_id, "login successful");
            *auth.session.lock().map_err(lock_err)? = Some(session);
            return Ok(role);
        }
    }

    let mut lockout = auth.lockout.lock().map_err(lock_err)?;
    record_failure(&mut lockout);
    persist_lockout_or_warn(db, &lockout);
    Err(PosError::Auth("Wrong PIN".into()))
}

pub fn logout(auth: &AuthState) {
    if let Ok(mut session) = auth.session.lock() {
        if let Some(s) = session.take() {
            info!(session_id = %s.session_id, role = s.role.as_str(), "logged out");
        }
    }
}

pub fn current_role(auth: &AuthState) -> Option<Role> {
    auth.session
        .lock()
        .ok()
        .and_then(|s| s.as_ref().map(|s| s.role))
}

/// Refuse anything but an admin session.
pub fn require_admin(auth: &AuthState) -> PosResult<()> {
    match current_role(auth) {
        Some(Role::Admin) => Ok(()),
        Some(Role::Cashier) => Err(PosError::Auth("Admin access required".into())),
        None => Err(PosError::Auth("Not logged in".into())),
    }
}

/// Current session as JSON, or null.
pub fn session_json(auth: &AuthState) -> Value {
    let session = auth.session.lock().ok().and_then(|s| s.clone());
    match session {
        Some(s) => serde_json::json!({
            "sessionId": s.session_id,
            "role": s.role,
            "loginTime": s.login_time.to_rfc3339(),
        }),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lockout_attempts(db: &DbState) -> u32 {
        db::read_setting(db, CATEGORY_STAFF, LOCKOUT_ATTEMPTS_KEY)
            .expect("read")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0)
    }

    #[test]
    fn default_pins_apply_until_stored() {
        let db = DbState::in_memory().expect("db");
        let auth = AuthState::new();
        assert_eq!(login(&db, &auth, "1234".to_string()).expect("admin"), Role::Admin);
        assert_eq!(current_role(&auth), Some(Role::Admin));
        assert_eq!(login(&db, &auth, "0000".to_string()).expect("cashier"), Role::Cashier);
        assert_eq!(current_role(&auth), Some(Role::Cashier));
    }

    #[test]
    fn stored_pin_replaces_default() {
        let db = DbState::in_memory().expect("db");
        store_pin(&db, SettingKey::AdminPin, "2468").expect("store");
        let auth = AuthState::new();

        let err = login(&db, &auth, "1234".to_string()).expect_err("old default");
        assert_eq!(err, PosError::Auth("Wrong PIN".into()));
        assert_eq!(login(&db, &auth, "2468".to_string()).expect("new pin"), Role::Admin);
    }

    #[test]
    fn store_pin_skips_rehash_for_same_pin() {
        let db = DbState::in_memory().expect("db");
        store_pin(&db, SettingKey::CashierPin, "1111").expect("first");
        let first = db::read_setting(&db, CATEGORY_STAFF, "cashier_pin_hash").expect("read");
        store_pin(&db, SettingKey::CashierPin, "1111").expect("second");
        let second = db::read_setting(&db, CATEGORY_STAFF, "cashier_pin_hash").expect("read");
        assert_eq!(first, second);
    }

    #[test]
    fn new_pin_validation() {
        assert!(matches!(
            validate_new_pin("123", "123"),
            Err(PosError::Validation(_))
        ));
        assert!(matches!(
            validate_new_pin("12a4", "12a4"),
            Err(PosError::Validation(_))
        ));
        assert_eq!(
            validate_new_pin("1234", "4321"),
            Err(PosError::validation("PIN confirmation does not match"))
        );
        assert!(validate_new_pin("123456", "123456").is_ok());
    }

    #[test]
    fn lockout_entry_round_trips_through_settings() {
        let db = DbState::in_memory().expect("db");
        let entry = LockoutEntry {
            attempts: 3,
            last_attempt: Utc::now() - Duration::minutes(2),
        };
        persist_lockout(&db, &entry).expect("persist");
        let loaded = load_lockout(&db).expect("load");
        assert_eq!(loaded.attempts, 3);
        assert_eq!(
            loaded.last_attempt.timestamp(),
            entry.last_attempt.timestamp()
        );
        assert_eq!(lockout_attempts(&db), 3);
    }

    #[test]
    fn lockout_persists_across_auth_state_restart() {
        let db = DbState::in_memory().expect("db");
        let before_restart = AuthState::new();

        for _ in 0..MAX_FAILED_ATTEMPTS {
            let err = login(&db, &before_restart, "9999".to_string())
                .expect_err("invalid login should fail");
            assert_eq!(err, PosError::Auth("Wrong PIN".into()));
        }
        assert_eq!(lockout_attempts(&db), MAX_FAILED_ATTEMPTS);

        let after_restart = AuthState::new();
        let err = login(&db, &after_restart, "1234".to_string())
            .expect_err("lockout should remain active after restart");
        assert!(
            err.to_string().contains("Too many failed attempts"),
            "unexpected lockout error message: {err}"
        );
        assert_eq!(lockout_attempts(&db), MAX_FAILED_ATTEMPTS);
    }

    #[test]
    fn successful_login_resets_lockout() {
        let db = DbState::in_memory().expect("db");
        let auth = AuthState::new();
        for _ in 0..2 {
            let _ = login(&db, &auth, "9999".to_string());
        }
        assert_eq!(lockout_attempts(&db), 2);

        login(&db, &auth, "0000".to_string()).expect("cashier login");
        assert_eq!(lockout_attempts(&db), 0);
    }

    #[test]
    fn logout_clears_session_and_admin_gate() {
        let db = DbState::in_memory().expect("db");
        let auth = AuthState::new();
        assert!(session_json(&auth).is_null());

        login(&db, &auth, "1234".to_string()).expect("login");
        assert!(require_admin(&auth).is_ok());
        assert_eq!(session_json(&auth)["role"], "ADMIN");

        logout(&auth);
        assert_eq!(current_role(&auth), None);
        assert!(require_admin(&auth).is_err());
    }

    #[test]
    fn cashier_fails_admin_gate() {
        let db = DbState::in_memory().expect("db");
        let auth = AuthState::new();
        login(&db, &auth, "0000".to_string()).expect("login");
        assert_eq!(
            require_admin(&auth),
            Err(PosError::Auth("Admin access required".into()))
        );
    }
}
