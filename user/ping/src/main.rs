//! IPC ping-pong demo, `ping` side.
//!
//! Creates a reply port, looks up `pong` in the service registry (spinning
//! until it has registered), sends it `b"PING"` followed by the reply
//! port number, then blocks waiting for the answer.

#![no_std]
#![no_main]

use libmnos::{debug_println, entry_point, ipc_create_port, ipc_recv, ipc_send, service_lookup, yield_now};

entry_point!(main);

fn main() -> ! {
    let reply_port = ipc_create_port();

    let pong_port = loop {
        if let Some(port) = service_lookup("pong") {
            break port;
        }
        yield_now();
    };

    let mut msg = [0u8; 8];
    msg[..4].copy_from_slice(b"PING");
    msg[4..8].copy_from_slice(&reply_port.to_le_bytes());
    ipc_send(pong_port, &msg);

    let mut buf = [0u8; 256];
    let (size, _sender) = ipc_recv(reply_port, &mut buf).expect("pong never answered");

    if &buf[..size as usize] == b"PONG" {
        debug_println("PING: ok");
    } else {
        debug_println("PING: bad reply");
    }

    libmnos::thread_exit(0);
}
