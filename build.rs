fn main() {
    // Only firmware builds need the ESP-IDF environment exported; host test
    // builds compile without the `espidf` feature and skip this entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
