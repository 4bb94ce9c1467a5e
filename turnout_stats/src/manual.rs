/*!

This is the long-form manual for `turnout_stats` and `turnout_report`.

## Input format

The source is a single table (the first worksheet of an Excel workbook, or a CSV
file) with one row per locality. Only the following columns are read, in whatever
order they appear:

| column                         | meaning                                      |
|--------------------------------|----------------------------------------------|
| `Judet`                        | county                                       |
| `UAT`                          | administrative unit code                     |
| `Localitate`                   | locality name                                |
| `Mediu`                        | settlement type (`U` urban, `R` rural)       |
| `Înscriși pe liste permanente` | registered voters                            |
| `Voturi Totale`                | votes cast                                   |
| `Barbati`, `Femei`             | votes cast by men and by women               |
| `Femei 18` .. `Femei 120`      | votes cast by women of the given age         |
| `Barbati 18` .. `Barbati 120`  | votes cast by men of the given age           |

All the other columns are ignored. A column of the list that is absent from the
source is skipped with a warning. For the age columns, the age is then reported
without a value rather than with zero votes.

## Statistics

### Turnout

The turnout of a locality is `votes cast / registered voters`. It is undefined when
there is no registered voter. An undefined turnout is not an error: such a
locality is simply left out of the ranking of localities.

The turnout of a group of localities (a county, or all the urban localities) is
the ratio of the sums, not the average of the turnouts:

```text
turnout(group) = sum(votes cast) / sum(registered voters)
```

A locality with 10 000 voters weighs a hundred times more than a locality with
100 voters.

### Ranking

The ranking keeps the 10 localities with the highest turnout (see `--top-n`).
Localities with the same turnout keep the order of the source.

### Orders

- counties by turnout: increasing turnout, undefined last
- settlement types: alphabetical order of the labels, as written in the source
- men and women per county: increasing number of women

## Configuration

`turnout_report` runs without any argument: it reads `Adatbazis.xlsx` and writes
`jelentes.html` in the current directory. All the constants (paths, column names,
titles, colors, narrative text) can be changed with a JSON configuration file passed
with `--config`. Every key is optional:

```json
{
  "sourcePath": "Adatbazis.xlsx",
  "outputPath": "jelentes.html",
  "topN": 10,
  "columns": { "county": "Judet", "femaleAgePrefix": "Femei " },
  "charts": { "countyTurnout": { "title": "1. Megyénkénti részvételi arány" } }
}
```

The report always has four question/answer blocks: when `questions` is given, it
must contain exactly four `{ "question": ..., "answer": ... }` entries.

The command line options take precedence over the configuration file.

 */
