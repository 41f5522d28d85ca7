use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

pub fn read_lines<P>(filename: P) -> io::Result<io::Lines<io::BufReader<File>>>
where
    P: AsRef<Path>,
{
    let file = File::open(filename)?;
    Ok(io::BufReader::new(file).lines())
}

pub fn read_stdin_lines() -> io::Lines<io::BufReader<io::Stdin>> {
    io::BufReader::new(io::stdin()).lines()
}

pub fn print_error(verbose: bool, msg: &str, err: &dyn std::fmt::Display) {
    if verbose {
        eprintln!("{}: {}", msg, err);
    }
}
