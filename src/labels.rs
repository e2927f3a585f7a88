use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};

/// One class of the model: its name and the nutrition text shown on a
/// confident prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct VegetableLabel {
    pub name: String,
    pub nutrition: String,
}

/// Ordered label table loaded from the data file stored next to the model.
/// File order is the training-time class order; the model's output vector is
/// interpreted against it, so the file is the single source of truth.
#[derive(Debug)]
pub struct LabelTable {
    labels: Vec<VegetableLabel>,
}

impl LabelTable {
    pub fn load(filepath: &Path) -> io::Result<Self> {
        let file = File::open(filepath)?;
        let reader = io::BufReader::new(file);

        let mut labels = Vec::new();
        for line_result in reader.lines() {
            let line = line_result?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.split_once('|') {
                Some((name, nutrition)) => labels.push(VegetableLabel {
                    name: name.trim().to_string(),
                    nutrition: nutrition.trim().to_string(),
                }),
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Invalid line format: {}", line),
                    ))
                }
            }
        }

        if labels.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Label file contains no entries",
            ));
        }

        Ok(Self { labels })
    }

    pub fn get(&self, class_index: usize) -> Option<&VegetableLabel> {
        self.labels.get(class_index)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VegetableLabel> {
        self.labels.iter()
    }
}

#[cfg(test)]
pub(crate) fn table_from_str(contents: &str) -> LabelTable {
    let labels = contents
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let (name, nutrition) = line.split_once('|').expect("bad test fixture line");
            VegetableLabel {
                name: name.trim().to_string(),
                nutrition: nutrition.trim().to_string(),
            }
        })
        .collect();
    LabelTable { labels }
}
