//! Generate frame test vectors for JavaScript client testing.
//!
//! Run with: cargo run --package protocol --example test_vectors

use protocol::framing;

fn main() {
    // Outbound: server to client
    print_test_vector("output_hello", &framing::encode_output(b"Hello"));
    print_test_vector("output_crlf", &framing::encode_output(b"$ ls\r\n"));
    print_test_vector("pong", &framing::encode_pong());
    print_test_vector("window_title", &framing::encode_window_title(b"bash"));
    print_test_vector(
        "reconnect",
        &framing::encode_reconnect(10).expect("serialization failed"),
    );
    print_test_vector(
        "preferences",
        &framing::encode_preferences(br#"{"font-size":14}"#),
    );

    // Inbound: client to server
    print_test_vector("input_ls", b"1ls\r");
    print_test_vector("ping", b"2");
    print_test_vector("resize_terminal", br#"3{"columns":120,"rows":40}"#);
}

fn print_test_vector(name: &str, frame: &[u8]) {
    print!("export const {} = new Uint8Array([", name);
    for (i, b) in frame.iter().enumerate() {
        if i > 0 {
            print!(", ");
        }
        print!("{}", b);
    }
    println!("]); // {:?}", String::from_utf8_lossy(frame));
}
