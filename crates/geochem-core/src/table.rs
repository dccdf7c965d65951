use polars::prelude::{Column, DataFrame, NamedFrom, PolarsError, Series};

use crate::assembler::AssembledRow;
use crate::catalog::ColumnCatalog;
use crate::model::ColumnKey;

pub const PUBLICATION_HEADER: &str = "PublicationIssue";

/// Sample attributes that lead every row, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FixedColumn {
    SampleId,
    SampleCode,
    SampleName,
    SampleType,
    SampleSubtype,
    Depth,
    Duplicate,
    Borehole,
    CoreTop,
    CoreBottom,
    Azimuth,
    Dip,
    DrillType,
    MaterialType,
    SampleDescription,
    Longitude,
    Latitude,
    Elevation,
    CoordConf,
    Region,
    UtmEasting,
    UtmNorthing,
    UtmZone,
}

impl FixedColumn {
    pub const ALL: [FixedColumn; 23] = [
        FixedColumn::SampleId,
        FixedColumn::SampleCode,
        FixedColumn::SampleName,
        FixedColumn::SampleType,
        FixedColumn::SampleSubtype,
        FixedColumn::Depth,
        FixedColumn::Duplicate,
        FixedColumn::Borehole,
        FixedColumn::CoreTop,
        FixedColumn::CoreBottom,
        FixedColumn::Azimuth,
        FixedColumn::Dip,
        FixedColumn::DrillType,
        FixedColumn::MaterialType,
        FixedColumn::SampleDescription,
        FixedColumn::Longitude,
        FixedColumn::Latitude,
        FixedColumn::Elevation,
        FixedColumn::CoordConf,
        FixedColumn::Region,
        FixedColumn::UtmEasting,
        FixedColumn::UtmNorthing,
        FixedColumn::UtmZone,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            FixedColumn::SampleId => "Sample_ID",
            FixedColumn::SampleCode => "Sample_Code",
            FixedColumn::SampleName => "Sample_Name",
            FixedColumn::SampleType => "Sample_Type",
            FixedColumn::SampleSubtype => "Sample_Subtype",
            FixedColumn::Depth => "Depth",
            FixedColumn::Duplicate => "Duplicate",
            FixedColumn::Borehole => "Borehole",
            FixedColumn::CoreTop => "Core_Top",
            FixedColumn::CoreBottom => "Core_Bottom",
            FixedColumn::Azimuth => "Azimuth",
            FixedColumn::Dip => "Dip",
            FixedColumn::DrillType => "Drill_Type",
            FixedColumn::MaterialType => "Material_Type",
            FixedColumn::SampleDescription => "Sample_Description",
            FixedColumn::Longitude => "Longitude",
            FixedColumn::Latitude => "Latitude",
            FixedColumn::Elevation => "Elevation",
            FixedColumn::CoordConf => "Coord_Conf",
            FixedColumn::Region => "Region",
            FixedColumn::UtmEasting => "UTM_Easting",
            FixedColumn::UtmNorthing => "UTM_Northing",
            FixedColumn::UtmZone => "UTM_Zone",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

pub fn publication_header(index: usize) -> String {
    if index == 0 {
        PUBLICATION_HEADER.to_string()
    } else {
        format!("{PUBLICATION_HEADER}{index}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Fixed,
    Publication,
    Analyte,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnHeader {
    Fixed(FixedColumn),
    Publication(usize),
    /// `occurrence` is 0 until duplicate headers are disambiguated.
    Analyte { key: ColumnKey, occurrence: usize },
}

impl ColumnHeader {
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnHeader::Fixed(_) => ColumnKind::Fixed,
            ColumnHeader::Publication(_) => ColumnKind::Publication,
            ColumnHeader::Analyte { .. } => ColumnKind::Analyte,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind() == ColumnKind::Analyte
    }

    pub fn render(&self) -> String {
        match self {
            ColumnHeader::Fixed(column) => column.header().to_string(),
            ColumnHeader::Publication(index) => publication_header(*index),
            ColumnHeader::Analyte { key, occurrence } => key.header(*occurrence),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub header: ColumnHeader,
    pub values: Vec<String>,
}

impl TableColumn {
    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|value| value.is_empty())
    }
}

/// Column-major flat table: one row per sample, typed headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatTable {
    columns: Vec<TableColumn>,
    height: usize,
}

impl FlatTable {
    /// Lays assembled rows out as `[fixed] [publications] [catalog slots]`.
    pub fn from_rows(catalog: &ColumnCatalog, rows: Vec<AssembledRow>) -> Self {
        let height = rows.len();
        let pub_width = catalog.publication_width();

        let mut columns: Vec<TableColumn> = FixedColumn::ALL
            .iter()
            .map(|column| TableColumn {
                header: ColumnHeader::Fixed(*column),
                values: Vec::with_capacity(height),
            })
            .collect();
        columns.extend((0..pub_width).map(|index| TableColumn {
            header: ColumnHeader::Publication(index),
            values: Vec::with_capacity(height),
        }));
        columns.extend(catalog.keys().iter().map(|key| TableColumn {
            header: ColumnHeader::Analyte {
                key: key.clone(),
                occurrence: 0,
            },
            values: Vec::with_capacity(height),
        }));

        let fixed_width = FixedColumn::ALL.len();
        for row in rows {
            let AssembledRow {
                fixed,
                publications,
                values,
                ..
            } = row;
            for (idx, value) in fixed.into_iter().enumerate() {
                columns[idx].values.push(value);
            }
            let mut publications = publications.into_iter();
            for idx in 0..pub_width {
                columns[fixed_width + idx]
                    .values
                    .push(publications.next().unwrap_or_default());
            }
            for (idx, value) in values.into_iter().enumerate() {
                let rendered = value.map(|abundance| abundance.to_string()).unwrap_or_default();
                columns[fixed_width + pub_width + idx].values.push(rendered);
            }
        }

        Self { columns, height }
    }

    pub fn from_columns(columns: Vec<TableColumn>) -> Self {
        let height = columns.first().map(|c| c.values.len()).unwrap_or(0);
        Self { columns, height }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> &mut Vec<TableColumn> {
        &mut self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.header.render()).collect()
    }

    pub fn column(&self, header: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.header.render() == header)
    }

    pub fn value(&self, row: usize, header: &str) -> Option<&str> {
        self.column(header)
            .and_then(|c| c.values.get(row))
            .map(String::as_str)
    }

    pub fn count_kind(&self, kind: ColumnKind) -> usize {
        self.columns.iter().filter(|c| c.header.kind() == kind).count()
    }

    pub fn row(&self, index: usize) -> Option<Vec<&str>> {
        if index >= self.height {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| c.values[index].as_str())
                .collect(),
        )
    }

    /// Fails on duplicate headers, so call after disambiguation.
    pub fn to_dataframe(&self) -> Result<DataFrame, PolarsError> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|c| Series::new(c.header.render().into(), c.values.as_slice()).into())
            .collect();
        DataFrame::new(columns)
    }
}
