/*!

This is the long-form manual for `school_survey` and `sekolah`.

## Categories

| Code   | Sections                                   | Infrastructure      |
|--------|--------------------------------------------|---------------------|
| `SD`   | grades `kelas1` .. `kelas6`                | general             |
| `SMP`  | grades `kelas7` .. `kelas9`                | junior secondary    |
| `TK`   | rombel types `tka`, `tkb`                  | early childhood     |
| `PAUD` | rombel types `kb`, `sps`, `tpa`            | early childhood     |
| `PKBM` | `paketA.kelas1..6`, `paketB.kelas7..9`, `paketC.kelas10..12` | general |

The codes `KB` and `SKB` are still accepted and stand for `PAUD` and `PKBM`. Any other
code gives a form without sections.

## Documents

All the keys of the form of a category are always present. Unset values are empty
strings. Counts under `siswa` and `siswaAbk` are `{l, p}` pairs (male, female), counts
under `rombel` are single numbers.

Teachers are counted under `guru` by employment: `pns`, `pppk`, `pppkParuhWaktu`,
`nonAsnDapodik`, `nonAsnTidakDapodik`, plus the shortfall `kekuranganGuru`. The total is
never typed in: it is the sum of the five employment counts, or the `jumlahGuru` stored by
older records if that one is larger.

## Payloads

The create and update procedures take `{location, school, classes, staffSummary}`.

* `classes` lists the non-zero student counts only, labelled `kelas1_L`, `tka_P`,
  `paketB_kelas8_L` and so on.
* `staffSummary` always has seven entries: `PNS`, `PPPK`, `PPPK_PARUH_WAKTU`,
  `NON_ASN_DAPODIK`, `NON_ASN_TIDAK_DAPODIK`, `KEKURANGAN_GURU`, `JUMLAH_GURU`.
* `school.meta` holds everything else. Each layout has its own keys for the section
  breakdowns (`siswa`, `siswaPaud`, `siswaPaket` and the matching special-needs and rombel
  keys).

On update, the new meta fields are laid over the stored ones and every stored key that
is not computed again is kept. The planned works (`kegiatanFisik`) are only computed when
at least one of them was filled in; a blank section leaves the stored values alone.

## Spreadsheets

A template has one column per field, named by its dotted path (`guru.pns`,
`prasarana.ruangan.perpustakaan.baik`). The identity columns come first, the others in
alphabetical order. Operator contact fields and rooms the category does not report are
left out.

When reading a sheet, columns whose name looks like an identifier (`npsn`, codes,
phone numbers, names, addresses, coordinates) stay text. Other numeric cells become
numbers. Blank rows are ignored, and a sheet without any data row is rejected.

## Command line

```text
sekolah template --category SD --records records.json --out template.xlsx
sekolah import --category SD --input filled.xlsx --out documents.json
sekolah payload --category SD --input filled.xlsx --records records.json --update --out batch.json
```

All the options can also be given in a JSON job file passed with `--config`:

```json
{
  "categoryCode": "SD",
  "input": "filled.xlsx",
  "output": "batch.json",
  "recordsFile": "records.json",
  "reference": "expected_batch.json",
  "regionLabels": {"subdistrict": "Coblong", "village": "Dago"}
}
```

Relative paths are resolved against the directory of the job file. Options given on the
command line take precedence. When a reference file is given, the output is compared to
it and the differences are printed.
*/
