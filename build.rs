fn main() {
    // cfg.toml が更新されたら toml_cfg の定数を再生成する
    println!("cargo:rerun-if-changed=cfg.toml");

    #[cfg(feature = "esp")]
    embuild::espidf::sysenv::output();
}
