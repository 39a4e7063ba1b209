fn main() {
    println!(
        "cargo:rustc-link-search=native={}",
        concat!(env!("CARGO_MANIFEST_DIR"), "/../../build")
    );
    println!("cargo:rustc-link-arg=-Tlinker-user.ld");
    println!("cargo:rerun-if-changed=../../build/linker-user.ld");
}
