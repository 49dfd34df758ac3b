//! File-level input and output: Newick tree files in, TSV matrices out.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::distance::DistanceMatrix;
use crate::newick::parse_newick;
use crate::tree::Tree;

/// Read every tree from a file holding one Newick string per line.
///
/// Blank lines are skipped. Lines that fail to parse are reported to
/// stderr and dropped rather than aborting the whole file.
pub fn read_newick_trees<P: AsRef<Path>>(path: P) -> io::Result<Vec<Tree>> {
    let content = fs::read_to_string(path.as_ref())?;

    let trees = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match parse_newick(line) {
            Ok(tree) => Some(tree),
            Err(e) => {
                eprintln!(
                    "Failed to parse tree {} at line {}: {}",
                    path.as_ref().display(),
                    idx + 1,
                    e
                );
                None
            }
        })
        .collect();

    Ok(trees)
}

/// Write a pairwise distance matrix as full square TSV to a file.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// Writing to stdout via `-` is not supported.
pub fn write_matrix_tsv<P: AsRef<Path>, T: Copy + Default + std::fmt::Display>(
    path: P,
    matrix: &DistanceMatrix<T>,
) -> io::Result<()> {
    let p = path.as_ref();
    if p.as_os_str() == "-" {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "writing to stdout is not supported by write_matrix_tsv",
        ));
    }

    let is_gz = p.to_string_lossy().ends_with(".gz");

    let mut out: Box<dyn Write> = if is_gz {
        let f = File::create(p)?;
        let enc = GzEncoder::new(f, Compression::default());
        Box::new(BufWriter::new(enc))
    } else {
        Box::new(BufWriter::new(File::create(p)?))
    };

    // Header row
    write!(&mut out, "\t")?;
    for (k, name) in matrix.labels().iter().enumerate() {
        if k > 0 {
            write!(&mut out, "\t")?;
        }
        write!(&mut out, "{}", name)?;
    }
    writeln!(&mut out)?;

    // Rows, expanded to the full square via the symmetric lookup
    for (i, name) in matrix.labels().iter().enumerate() {
        write!(&mut out, "{}", name)?;
        for j in 0..matrix.len() {
            write!(&mut out, "\t{}", matrix.get(i, j))?;
        }
        writeln!(&mut out)?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::distance_matrix;
    use std::env;

    #[test]
    fn reads_trees_and_skips_bad_lines() {
        let dir = env::temp_dir();
        let path = dir.join("phylotopo_io_read_test.nwk");
        fs::write(&path, "((A:1,B:1):1,C:2);\n\nnot a tree ((\n(D:1,E:1);\n").unwrap();

        let trees = read_newick_trees(&path).unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].to_newick(), "((A:1,B:1):1,C:2);");
        assert_eq!(trees[1].to_newick(), "(D:1,E:1);");

        fs::remove_file(&path).ok();
    }

    #[test]
    fn writes_square_tsv() {
        let tree = crate::newick::parse_newick("((A:1,B:1):1,C:2);").unwrap();
        let matrix = distance_matrix(&tree, 1, None);

        let path = env::temp_dir().join("phylotopo_io_write_test.tsv");
        write_matrix_tsv(&path, &matrix).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "\tA\tB\tC");
        assert_eq!(lines[1], "A\t0\t2\t4");
        assert_eq!(lines[2], "B\t2\t0\t4");
        assert_eq!(lines[3], "C\t4\t4\t0");

        fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_stdout_path() {
        let tree = crate::newick::parse_newick("(A:1,B:1);").unwrap();
        let matrix = distance_matrix(&tree, 1, None);
        assert!(write_matrix_tsv("-", &matrix).is_err());
    }
}
