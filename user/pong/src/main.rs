//! IPC ping-pong demo, `pong` side.
//!
//! Registers itself under the name `pong`, then blocks in recv. `ping`'s
//! message is `b"PING"` followed by a little-endian reply port number;
//! the reply is sent back to that port.

#![no_std]
#![no_main]

use libmnos::{debug_println, entry_point, ipc_create_port, ipc_recv, ipc_send, service_register};

entry_point!(main);

fn main() -> ! {
    let port = ipc_create_port();
    service_register("pong", port);

    let mut buf = [0u8; 256];
    let (size, _sender) = ipc_recv(port, &mut buf).expect("recv failed");

    if size as usize >= 8 && &buf[..4] == b"PING" {
        let reply_port = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        ipc_send(reply_port, b"PONG");
        debug_println("PONG: ok");
    } else {
        debug_println("PONG: bad request");
    }

    libmnos::thread_exit(0);
}
