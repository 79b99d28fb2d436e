fn main() {
    dbsuite::cli::run();
}
