fn main() {
    // ESP-IDF link arguments are only needed when building the firmware
    // image; host builds of the library and its tests skip them.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
