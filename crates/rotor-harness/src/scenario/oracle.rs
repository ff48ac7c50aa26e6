//! End-of-run checks over a finished [`World`].
//!
//! Each helper builds one check; [`all_of`] chains them and stops at the
//! first failure.

use std::time::Duration;

use rotor_core::{Credentials, SessionState};

use crate::scenario::World;

/// A check over the finished world. `Err` carries a human-readable reason.
pub type OracleFn = Box<dyn FnOnce(&World) -> Result<(), String>>;

/// Create an oracle that verifies the session ended in `expected`.
pub fn final_state(expected: SessionState) -> OracleFn {
    Box::new(move |world| {
        let state = world.session().state();
        if state == expected {
            Ok(())
        } else {
            Err(format!("session should end in {expected:?}, got {state:?}"))
        }
    })
}

/// Create an oracle that verifies exactly these credentials were published,
/// exactly once.
pub fn published(identity: &str, secret: &str) -> OracleFn {
    let expected = Credentials::new(identity, secret);
    Box::new(move |world| match world.published() {
        [only] if *only == expected => Ok(()),
        [only] => Err(format!("published {only:?}, expected {expected:?}")),
        all => Err(format!("credentials should be published once, got {} times", all.len())),
    })
}

/// Create an oracle that verifies nothing was published.
pub fn nothing_published() -> OracleFn {
    Box::new(|world| {
        if world.published().is_empty() {
            Ok(())
        } else {
            Err(format!("nothing should be published, got {:?}", world.published()))
        }
    })
}

/// Create an oracle that verifies login attempts went out at these virtual
/// times.
pub fn logins_at(expected: Vec<Duration>) -> OracleFn {
    Box::new(move |world| {
        let times = world.login_times();
        if times == expected {
            Ok(())
        } else {
            Err(format!("login attempts at {times:?}, expected {expected:?}"))
        }
    })
}

/// Create an oracle that verifies no armed timer survived the session.
pub fn no_armed_timers() -> OracleFn {
    Box::new(|world| {
        let armed: Vec<_> = world.session().armed_timers().collect();
        if armed.is_empty() { Ok(()) } else { Err(format!("timers still armed: {armed:?}")) }
    })
}

/// Combine multiple oracles into one.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world| {
        for oracle in oracles {
            oracle(world)?;
        }
        Ok(())
    })
}
