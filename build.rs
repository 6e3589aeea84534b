fn main() {
    // Device builds need the ESP-IDF sysenv exported to rustc; host builds
    // (simulator, tests) compile without any toolchain download.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
