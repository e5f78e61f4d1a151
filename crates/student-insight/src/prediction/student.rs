use std::path::Path;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for students owned by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Demographic and historical-academic record used as a read-only feature source.
///
/// Ordinal fields follow the UCI student-performance coding: parental education 0-4,
/// family relationship, alcohol use, health and going-out frequency 1-5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: StudentId,
    #[serde(default)]
    pub name: Option<String>,
    pub age: u8,
    #[serde(default)]
    pub sex: Option<String>,
    pub g1: f64,
    pub g2: f64,
    #[serde(default)]
    pub g3: Option<f64>,
    pub medu: u8,
    pub fedu: u8,
    pub famrel: u8,
    pub dalc: u8,
    pub walc: u8,
    pub health: u8,
    pub goout: u8,
    pub absences: u32,
    /// Weekly study hours.
    pub studytime: f64,
    #[serde(default)]
    pub failures: u8,
}

impl StudentRecord {
    /// Each absence costs three attendance points, floored at zero.
    pub fn attendance_rate(&self) -> f64 {
        (100.0 - self.absences as f64 * 3.0).max(0.0)
    }

    /// Mean of workday and weekend alcohol indices.
    pub fn alcohol_consumption(&self) -> f64 {
        (self.dalc as f64 + self.walc as f64) / 2.0
    }

    pub fn alcohol_sum(&self) -> u8 {
        self.dalc.saturating_add(self.walc)
    }

    pub fn parental_education(&self) -> f64 {
        (self.medu as f64 + self.fedu as f64) / 2.0
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id.0)
    }
}

/// Read access to the student table so real-data predictions can be exercised in isolation.
pub trait StudentDirectory: Send + Sync {
    fn fetch(&self, id: &StudentId) -> Result<Option<StudentRecord>, StudentDirectoryError>;
    fn list(&self) -> Result<Vec<StudentRecord>, StudentDirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StudentDirectoryError {
    #[error("student directory unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StudentImportError {
    #[error("failed to read student export: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed student row: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct StudentRow {
    #[serde(default, alias = "id")]
    student_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    age: u8,
    #[serde(default)]
    sex: Option<String>,
    #[serde(alias = "G1")]
    g1: f64,
    #[serde(alias = "G2")]
    g2: f64,
    #[serde(default, alias = "G3")]
    g3: Option<f64>,
    #[serde(alias = "Medu")]
    medu: u8,
    #[serde(alias = "Fedu")]
    fedu: u8,
    famrel: u8,
    #[serde(alias = "Dalc")]
    dalc: u8,
    #[serde(alias = "Walc")]
    walc: u8,
    health: u8,
    goout: u8,
    absences: u32,
    studytime: f64,
    #[serde(default)]
    failures: u8,
}

/// Parse a student export. Semicolon (UCI) and comma delimiters are both accepted; rows
/// without an identifier are numbered `stu-0001`, `stu-0002`, ... in file order.
pub fn import_students(raw: &str) -> Result<Vec<StudentRecord>, StudentImportError> {
    let header = raw.lines().next().unwrap_or_default();
    let delimiter = if header.contains(';') { b';' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let mut students = Vec::new();
    for (index, row) in reader.deserialize::<StudentRow>().enumerate() {
        let row = row?;
        let id = row
            .student_id
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| format!("stu-{:04}", index + 1));

        students.push(StudentRecord {
            id: StudentId(id),
            name: row.name.filter(|value| !value.is_empty()),
            age: row.age,
            sex: row.sex.filter(|value| !value.is_empty()),
            g1: row.g1,
            g2: row.g2,
            g3: row.g3,
            medu: row.medu,
            fedu: row.fedu,
            famrel: row.famrel,
            dalc: row.dalc,
            walc: row.walc,
            health: row.health,
            goout: row.goout,
            absences: row.absences,
            studytime: row.studytime,
            failures: row.failures,
        });
    }

    Ok(students)
}

pub fn import_students_from_path(path: &Path) -> Result<Vec<StudentRecord>, StudentImportError> {
    let raw = std::fs::read_to_string(path)?;
    import_students(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_uci_semicolon_export() {
        let raw = "school;sex;age;Medu;Fedu;studytime;failures;famrel;goout;Dalc;Walc;health;absences;G1;G2;G3\n\
                   GP;F;18;4;4;2;0;4;4;1;1;3;6;5;6;6\n\
                   GP;M;17;1;1;2;0;5;3;1;1;3;4;5;5;6\n";

        let students = import_students(raw).expect("uci export parses");

        assert_eq!(students.len(), 2);
        assert_eq!(students[0].id, StudentId("stu-0001".to_string()));
        assert_eq!(students[0].sex.as_deref(), Some("F"));
        assert_eq!(students[0].absences, 6);
        assert_eq!(students[1].g2, 5.0);
        assert_eq!(students[1].g3, Some(6.0));
    }

    #[test]
    fn keeps_explicit_identifiers_and_names() {
        let raw = "student_id,name,age,g1,g2,medu,fedu,famrel,dalc,walc,health,goout,absences,studytime\n\
                   s-42,Avery Lee,16,12,14,3,2,4,1,2,5,3,2,6\n";

        let students = import_students(raw).expect("comma export parses");

        assert_eq!(students[0].id.0, "s-42");
        assert_eq!(students[0].display_name(), "Avery Lee");
        assert_eq!(students[0].failures, 0);
        assert!(students[0].g3.is_none());
    }

    #[test]
    fn rejects_non_numeric_grades() {
        let raw = "age,g1,g2,medu,fedu,famrel,dalc,walc,health,goout,absences,studytime\n\
                   16,twelve,14,3,2,4,1,2,5,3,2,6\n";

        assert!(matches!(import_students(raw), Err(StudentImportError::Csv(_))));
    }

    #[test]
    fn derived_fields_follow_record_values() {
        let raw = "age,g1,g2,medu,fedu,famrel,dalc,walc,health,goout,absences,studytime\n\
                   16,12,14,3,2,4,2,5,5,3,40,6\n";
        let student = import_students(raw).expect("parses").remove(0);

        assert_eq!(student.attendance_rate(), 0.0);
        assert_eq!(student.alcohol_consumption(), 3.5);
        assert_eq!(student.alcohol_sum(), 7);
        assert_eq!(student.parental_education(), 2.5);
    }
}
