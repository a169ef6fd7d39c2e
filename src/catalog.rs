use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub const YEARS: std::ops::RangeInclusive<u8> = 1..=5;
pub const SEMESTERS: std::ops::RangeInclusive<u8> = 1..=2;

const EARLY_YEAR_DEPARTMENTS: &[&str] = &["IT", "General Departments"];
const LATE_YEAR_DEPARTMENTS: &[&str] = &[
    "IT",
    "CS",
    "Statistics",
    "Math",
    "CS & Statistics",
    "CS & Math",
    "Math & Statistics",
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Year {0} does not exist")]
    UnknownYear(u8),
    #[error("Semester {0} does not exist")]
    UnknownSemester(u8),
    #[error("Department '{department}' is not offered in year {year}")]
    UnknownDepartment { department: String, year: u8 },
    #[error("Select a {0} first")]
    MissingSelection(&'static str),
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subject {
    pub name: &'static str,
    pub progress: u8,
    pub chapters: u8,
}

const fn subject(name: &'static str, progress: u8, chapters: u8) -> Subject {
    Subject { name, progress, chapters }
}

struct Offering {
    department: &'static str,
    year: u8,
    semester: u8,
    subjects: &'static [Subject],
}

static OFFERINGS: &[Offering] = &[
    Offering {
        department: "IT",
        year: 1,
        semester: 1,
        subjects: &[
            subject("Principles of computing", 75, 12),
            subject("Descriptive statistics", 60, 10),
            subject("Information Technology Fundamentals", 85, 15),
            subject("Islamic culture", 45, 8),
            subject("Sudanese Studies", 30, 6),
            subject("Arabic", 55, 8),
        ],
    },
    Offering {
        department: "IT",
        year: 1,
        semester: 2,
        subjects: &[
            subject("Matrix Algebra", 40, 10),
            subject("Fundamentals of programming", 70, 14),
            subject("Accounting principles", 25, 12),
            subject("Physics", 50, 13),
            subject("Computer architecture and equipments", 65, 15),
        ],
    },
    Offering {
        department: "IT",
        year: 2,
        semester: 1,
        subjects: &[
            subject("Principles of programming", 80, 12),
            subject("Statistics and probability", 55, 10),
            subject("Data structures and algorithms", 90, 15),
            subject("Linear algebra", 35, 9),
            subject("Economic", 20, 8),
            subject("Discrete structure", 45, 11),
        ],
    },
    Offering {
        department: "IT",
        year: 2,
        semester: 2,
        subjects: &[
            subject("Introduction of statistical inference", 60, 10),
            subject("Object Oriented Programming", 85, 14),
            subject("Software requirement engineering", 40, 12),
            subject("Communication skills", 70, 6),
            subject("File management", 50, 8),
        ],
    },
    Offering {
        department: "IT",
        year: 3,
        semester: 1,
        subjects: &[
            subject("Advanced database", 65, 12),
            subject("Commercial programming", 55, 10),
            subject("Networks 2", 75, 11),
            subject("Software engineering", 80, 13),
            subject("Operating System", 70, 14),
        ],
    },
    Offering {
        department: "IT",
        year: 3,
        semester: 2,
        subjects: &[
            subject("Compiler", 30, 12),
            subject("Assembly", 45, 10),
            subject("Commercial programming", 60, 11),
            subject("Computer architecture", 50, 13),
        ],
    },
    Offering {
        department: "General Departments",
        year: 1,
        semester: 1,
        subjects: &[
            subject("Arabic", 65, 8),
            subject("Sudanese studies", 50, 6),
            subject("Islamic culture", 70, 8),
            subject("Calculus 1", 80, 12),
            subject("Algebra", 55, 10),
            subject("Basics of mathematics", 75, 14),
            subject("English", 60, 8),
        ],
    },
    Offering {
        department: "General Departments",
        year: 1,
        semester: 2,
        subjects: &[
            subject("Object oriented programming", 85, 14),
            subject("Arithmetic", 45, 10),
            subject("Programming Fundamentals", 90, 14),
            subject("Calculus 2", 70, 12),
            subject("Statistics and Probability", 55, 11),
            subject("Analytic geometry", 40, 9),
        ],
    },
    Offering {
        department: "General Departments",
        year: 2,
        semester: 2,
        subjects: &[
            subject("Real analysis 1", 60, 12),
            subject("File management", 75, 8),
            subject("Introduction to Inferential Statistics", 50, 10),
            subject("Differential equations 2", 65, 11),
            subject("Vectors analysis", 55, 9),
        ],
    },
    Offering {
        department: "General Departments",
        year: 3,
        semester: 1,
        subjects: &[
            subject("Database", 70, 12),
            subject("Operating System", 80, 13),
            subject("Software engineering", 65, 12),
            subject("Computer networking", 75, 11),
        ],
    },
    Offering {
        department: "General Departments",
        year: 3,
        semester: 2,
        subjects: &[
            subject("Compiler", 35, 12),
            subject("Assembly", 50, 10),
            subject("Commercial programming", 60, 11),
            subject("Computer architecture", 45, 13),
        ],
    },
];

pub fn departments(year: u8) -> &'static [&'static str] {
    if year <= 3 {
        EARLY_YEAR_DEPARTMENTS
    } else {
        LATE_YEAR_DEPARTMENTS
    }
}

/// Subjects for a selection path; unknown paths have none.
pub fn subjects(department: &str, year: u8, semester: u8) -> &'static [Subject] {
    OFFERINGS
        .iter()
        .find(|o| o.department == department && o.year == year && o.semester == semester)
        .map(|o| o.subjects)
        .unwrap_or(&[])
}

/// Breadcrumb levels, root first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Root,
    Year,
    Department,
}

/// Year → department → semester drill-down. Choosing or returning to an
/// upstream level clears everything below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectBrowser {
    year: Option<u8>,
    department: Option<&'static str>,
    semester: Option<u8>,
}

impl SubjectBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_year(&mut self, year: u8) -> Result<(), CatalogError> {
        if !YEARS.contains(&year) {
            return Err(CatalogError::UnknownYear(year));
        }
        self.year = Some(year);
        self.department = None;
        self.semester = None;
        Ok(())
    }

    pub fn select_department(&mut self, department: &str) -> Result<(), CatalogError> {
        let year = self.year.ok_or(CatalogError::MissingSelection("year"))?;
        let found = departments(year)
            .iter()
            .find(|d| d.eq_ignore_ascii_case(department.trim()))
            .ok_or_else(|| CatalogError::UnknownDepartment {
                department: department.to_string(),
                year,
            })?;
        self.department = Some(*found);
        self.semester = None;
        Ok(())
    }

    pub fn select_semester(&mut self, semester: u8) -> Result<(), CatalogError> {
        if self.department.is_none() {
            return Err(CatalogError::MissingSelection("department"));
        }
        if !SEMESTERS.contains(&semester) {
            return Err(CatalogError::UnknownSemester(semester));
        }
        self.semester = Some(semester);
        Ok(())
    }

    /// Returns to a breadcrumb level, dropping the selections below it.
    pub fn back_to(&mut self, level: Level) {
        match level {
            Level::Root => self.reset(),
            Level::Year => {
                self.department = None;
                self.semester = None;
            }
            Level::Department => self.semester = None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn year(&self) -> Option<u8> {
        self.year
    }

    pub fn department(&self) -> Option<&'static str> {
        self.department
    }

    pub fn semester(&self) -> Option<u8> {
        self.semester
    }

    /// Choices offered at the current step, or `None` once subjects are shown.
    pub fn options(&self) -> Option<Vec<String>> {
        match (self.year, self.department, self.semester) {
            (None, _, _) => Some(YEARS.map(|y| format!("Year {}", y)).collect()),
            (Some(year), None, _) => Some(departments(year).iter().map(|d| d.to_string()).collect()),
            (Some(_), Some(_), None) => Some(SEMESTERS.map(|s| format!("Semester {}", s)).collect()),
            _ => None,
        }
    }

    pub fn subjects(&self) -> &'static [Subject] {
        match (self.year, self.department, self.semester) {
            (Some(year), Some(department), Some(semester)) => subjects(department, year, semester),
            _ => &[],
        }
    }
}

impl fmt::Display for SubjectBrowser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Courses")?;
        if let Some(year) = self.year {
            write!(f, " / Year {}", year)?;
        }
        if let Some(department) = self.department {
            write!(f, " / {}", department)?;
        }
        if let Some(semester) = self.semester {
            write!(f, " / Semester {}", semester)?;
        }
        Ok(())
    }
}
