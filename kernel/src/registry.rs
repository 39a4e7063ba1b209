//! Service registry — a flat name-to-port table that lets user processes
//! discover each other without a shared naming convention baked into every
//! binary.
//!
//! Registration is entirely advisory: the registry never checks that a
//! registered port actually exists or has a receiver parked on it.

use crate::sync::spinlock::SpinLock;

/// Maximum number of concurrently registered services.
pub const MAX_SERVICES: usize = 32;

/// Fixed width of a service name, in bytes. Names are compared only up to
/// this length; excess bytes are simply never looked at.
pub const SERVICE_NAME_MAX: usize = 32;

#[derive(Debug)]
pub enum RegistryError {
    Full,
}

#[derive(Clone, Copy)]
struct Entry {
    used: bool,
    name: [u8; SERVICE_NAME_MAX],
    len: usize,
    port: u32,
}

impl Entry {
    const fn empty() -> Self {
        Self {
            used: false,
            name: [0; SERVICE_NAME_MAX],
            len: 0,
            port: 0,
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.used && &self.name[..self.len] == name.as_bytes()
    }
}

struct Table {
    entries: [Entry; MAX_SERVICES],
}

static SERVICES: SpinLock<Table> = SpinLock::new(Table {
    entries: [Entry::empty(); MAX_SERVICES],
});

/// Registers `name` under `port`, reusing a freed slot if one matches the
/// same name, otherwise the first free slot. `name` is truncated to
/// [`SERVICE_NAME_MAX`] bytes. Fails only if the table is full.
pub fn register(name: &str, port: u32) -> Result<(), RegistryError> {
    let bytes = name.as_bytes();
    let len = bytes.len().min(SERVICE_NAME_MAX);

    let mut table = SERVICES.lock();
    if let Some(slot) = table.entries.iter().position(|e| e.matches(name)) {
        table.entries[slot].port = port;
        return Ok(());
    }
    let Some(slot) = table.entries.iter().position(|e| !e.used) else {
        return Err(RegistryError::Full);
    };
    let mut buf = [0u8; SERVICE_NAME_MAX];
    buf[..len].copy_from_slice(&bytes[..len]);
    table.entries[slot] = Entry {
        used: true,
        name: buf,
        len,
        port,
    };
    Ok(())
}

/// Looks up the port registered under `name`, or `None` if no entry
/// matches.
pub fn lookup(name: &str) -> Option<u32> {
    let table = SERVICES.lock();
    table
        .entries
        .iter()
        .find(|e| e.matches(name))
        .map(|e| e.port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn register_then_lookup_round_trips() {
        register("blkdevd-test", 7).unwrap();
        assert_eq!(lookup("blkdevd-test"), Some(7));
    }

    #[test_case]
    fn lookup_missing_returns_none() {
        assert_eq!(lookup("no-such-service"), None);
    }

    #[test_case]
    fn reregistering_updates_port_in_place() {
        register("shelld-test", 1).unwrap();
        register("shelld-test", 2).unwrap();
        assert_eq!(lookup("shelld-test"), Some(2));
    }
}
