use std::io::Read;

use crate::transaction::Transaction;
use csv::{Position, Reader, StringRecord, Trim};

/// Parses a transaction batch in CSV format, with a `from,to,value` header.
///
/// Yields every row together with the line it starts on.
pub struct CsvTransactionParser<R> {
    reader: Reader<R>,
    headers: StringRecord,
    record: StringRecord,
}

impl<R> CsvTransactionParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> csv::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .from_reader(source);
        let headers = reader.headers()?.clone();

        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
        })
    }
}

impl<R> Iterator for CsvTransactionParser<R>
where
    R: Read,
{
    type Item = (u64, csv::Result<Transaction>);

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                let line = self.record.position().map_or(0, Position::line);
                Some((line, self.record.deserialize(Some(&self.headers))))
            }
            Err(err) => Some((self.reader.position().line(), Err(err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rows_with_lines() {
        let input = "from, to, value\nandrej, babayaga, 2000\n babayaga,andrej,1\n";
        let rows: Vec<_> = CsvTransactionParser::new(input.as_bytes())
            .unwrap()
            .map(|(line, row)| (line, row.unwrap()))
            .collect();
        assert_eq!(
            rows,
            vec![
                (2, Transaction::new("andrej", "babayaga", 2000)),
                (3, Transaction::new("babayaga", "andrej", 1)),
            ]
        );
    }

    #[test]
    fn negative_value_is_an_error() {
        let input = "from,to,value\na,b,-3\n";
        let mut parser = CsvTransactionParser::new(input.as_bytes()).unwrap();
        let (line, row) = parser.next().unwrap();
        assert_eq!(line, 2);
        assert!(row.is_err());
    }
}
