fn main() {
    std::process::exit(dupctl::cli::run());
}
