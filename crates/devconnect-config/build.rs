fn main() {
    // option_env!() values are cached otherwise.
    println!("cargo:rerun-if-env-changed=DEVCONNECT_API_URL");
}
