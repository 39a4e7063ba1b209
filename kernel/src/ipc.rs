//! IPC — synchronous message passing over named ports.
//!
//! A port is a bounded FIFO owned by the thread that created it. `send`
//! never blocks (it fails once the queue is full); `recv` blocks the
//! caller until a message arrives. At most one thread is ever parked on
//! a port at a time, and a successful `send` wakes exactly that thread
//! when one is waiting — never more, never a thread parked elsewhere.

use crate::sync::spinlock::SpinLock;
use crate::task::process;

/// Maximum number of live ports.
pub const MAX_PORTS: usize = 64;

/// Depth of each port's message queue.
pub const PORT_DEPTH: usize = 16;

/// Maximum payload size, in bytes, carried by a single message.
pub const IPC_MSG_MAX_SIZE: usize = 256;

/// A delivered message: who sent it, how much data, and the data itself.
#[derive(Clone, Copy)]
pub struct Message {
    pub sender: u64,
    pub size: u32,
    pub data: [u8; IPC_MSG_MAX_SIZE],
}

impl Message {
    const fn empty() -> Self {
        Self {
            sender: 0,
            size: 0,
            data: [0; IPC_MSG_MAX_SIZE],
        }
    }
}

/// Errors a caller can observe from the IPC surface.
#[derive(Debug)]
pub enum IpcError {
    /// No free port slot left in the table.
    NoPorts,
    /// `port` does not name a live port.
    BadPort,
    /// The calling thread does not own this port.
    NotOwner,
    /// The payload exceeds [`IPC_MSG_MAX_SIZE`].
    TooLarge,
    /// The port's queue is full.
    QueueFull,
}

struct Port {
    /// 0 ⇒ slot unused. Monotonic once assigned — never reused.
    number: u32,
    owner: u64,
    queue: [Message; PORT_DEPTH],
    head: usize,
    tail: usize,
    count: usize,
    /// Thread id parked in `recv`, if any.
    parked: Option<u64>,
}

impl Port {
    const fn empty() -> Self {
        Self {
            number: 0,
            owner: 0,
            queue: [Message::empty(); PORT_DEPTH],
            head: 0,
            tail: 0,
            count: 0,
            parked: None,
        }
    }
}

struct PortTable {
    ports: [Port; MAX_PORTS],
    next_port: u32,
}

impl PortTable {
    const fn new() -> Self {
        Self {
            ports: [const { Port::empty() }; MAX_PORTS],
            next_port: 1,
        }
    }

    fn find_mut(&mut self, port: u32) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.number == port)
    }
}

static PORTS: SpinLock<PortTable> = SpinLock::new(PortTable::new());

/// Allocates a fresh port owned by `owner`. Returns 0 on exhaustion.
pub fn create_port(owner: u64) -> u32 {
    let mut table = PORTS.lock();
    let Some(slot) = table.ports.iter().position(|p| p.number == 0) else {
        return 0;
    };
    let number = table.next_port;
    table.next_port += 1;
    let port = &mut table.ports[slot];
    *port = Port::empty();
    port.number = number;
    port.owner = owner;
    number
}

/// Sends `buf` to `port` as `sender`. Wakes a parked receiver, if any.
///
/// Interrupts must already be disabled by the caller (syscall entry runs
/// with a trap gate, which leaves IF clear for the duration of dispatch).
pub fn send(port: u32, sender: u64, buf: &[u8]) -> Result<(), IpcError> {
    if buf.len() > IPC_MSG_MAX_SIZE {
        return Err(IpcError::TooLarge);
    }

    let woken = {
        let mut table = PORTS.lock();
        let p = table.find_mut(port).ok_or(IpcError::BadPort)?;
        if p.count == PORT_DEPTH {
            return Err(IpcError::QueueFull);
        }

        let mut msg = Message::empty();
        msg.sender = sender;
        msg.size = buf.len() as u32;
        msg.data[..buf.len()].copy_from_slice(buf);

        p.queue[p.tail] = msg;
        p.tail = (p.tail + 1) % PORT_DEPTH;
        p.count += 1;

        p.parked.take()
    };

    if let Some(tid) = woken {
        process::wake(tid);
    }

    Ok(())
}

/// Blocking receive. Only the port's owner may call this. Copies the
/// payload into `buf` (which must be at least [`IPC_MSG_MAX_SIZE`] bytes)
/// and returns `(size, sender)`.
pub fn recv(port: u32, buf: &mut [u8]) -> Result<(u32, u64), IpcError> {
    let caller = process::current_tid();

    loop {
        let dequeued = {
            let mut table = PORTS.lock();
            let p = table.find_mut(port).ok_or(IpcError::BadPort)?;
            if p.owner != caller {
                return Err(IpcError::NotOwner);
            }

            if p.count == 0 {
                // Invariant: at most one thread parked on a port at a time.
                p.parked = Some(caller);
                None
            } else {
                let msg = p.queue[p.head];
                p.head = (p.head + 1) % PORT_DEPTH;
                p.count -= 1;
                Some(msg)
            }
        };

        match dequeued {
            Some(msg) => {
                let n = msg.size as usize;
                buf[..n].copy_from_slice(&msg.data[..n]);
                return Ok((msg.size, msg.sender));
            }
            None => {
                // Block and reschedule; re-check on resumption.
                process::block_current();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn send_recv_round_trip_preserves_order() {
        let port = create_port(0);
        send(port, 1, b"first").unwrap();
        send(port, 2, b"second").unwrap();
        let mut buf = [0u8; IPC_MSG_MAX_SIZE];
        let (size, sender) = recv(port, &mut buf).unwrap();
        assert_eq!(&buf[..size as usize], b"first");
        assert_eq!(sender, 1);
        let (size, sender) = recv(port, &mut buf).unwrap();
        assert_eq!(&buf[..size as usize], b"second");
        assert_eq!(sender, 2);
    }

    #[test_case]
    fn send_fails_once_queue_is_full() {
        let port = create_port(0);
        for i in 0..PORT_DEPTH {
            send(port, 0, &[i as u8]).unwrap();
        }
        assert!(matches!(send(port, 0, &[0]), Err(IpcError::QueueFull)));
    }

    #[test_case]
    fn send_rejects_oversize_payload() {
        let port = create_port(0);
        let big = [0u8; IPC_MSG_MAX_SIZE + 1];
        assert!(matches!(send(port, 0, &big), Err(IpcError::TooLarge)));
    }
}
