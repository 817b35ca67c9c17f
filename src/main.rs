fn main() {
    quartz::run_cli();
}
