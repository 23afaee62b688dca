fn main() {
    println!("cargo:rerun-if-changed=components/zb_bridge");

    // Host builds (tests, fuzzing) have no ESP-IDF environment to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
